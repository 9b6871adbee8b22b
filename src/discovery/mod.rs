//! Service discovery: `_raop._tcp` advertisement

pub mod advertiser;

pub use advertiser::{
    AdvertiserConfig, AdvertiserError, RaopAdvertiser, RaopCapabilities, ServiceAdvertiser,
};
