pub mod http;
pub mod identity;
pub mod sign_out;
pub mod store;

pub use http::ReqwestTransport;
pub use identity::SecureTokenProvider;
pub use sign_out::NoticeSignOut;
pub use store::FileSessionStore;
