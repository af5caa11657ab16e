
pub(crate) use dataset::*;
pub(crate) use fake_service::*;
pub(crate) use session_fixture::*;
