//! Headless gallery client.
//!
//! [`GalleryController`] owns the rendered view and drives listing, upload and
//! download against a [`GalleryBackend`]. When the backend cannot list, images
//! are located by probing storage URLs directly through a [`UrlProber`].

pub mod api;
pub mod controller;
pub mod error;
pub mod indicator;
pub mod notify;
pub mod probe;
pub mod resolver;
pub mod view;

pub use api::{GalleryBackend, HttpGalleryBackend, SelectedFile};
pub use controller::{
    DownloadRequest, GalleryController, GallerySource, LoadOutcome, UploadOutcome,
};
pub use error::ClientError;
pub use indicator::LoadingIndicator;
pub use notify::{ConsoleNotifier, MemoryNotifier, Notice, Notifier};
pub use probe::{HttpProber, UrlProber};
pub use resolver::{EncodingStrategy, ResolverConfig};
pub use view::{Card, CardOrigin, GalleryViewState};
