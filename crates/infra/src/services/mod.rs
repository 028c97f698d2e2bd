mod document_store;
mod google_auth;
mod push;
mod token_directory;

pub use document_store::{
    field_paths, merge_into, Document, FirestoreDocumentStore, IDocumentStore,
    InMemoryDocumentStore,
};
pub use google_auth::{
    AccessToken, GoogleAuthProvider, GoogleCredentials, IAccessTokenProvider, ITokenRefresher,
    OAuthRefresher,
};
pub use push::{fan_out, FcmPushGateway, IPushGateway, InMemoryPushGateway, PushError, SentPush};
pub use token_directory::{token_document_path, DocumentTokenDirectory, ITokenDirectory};
