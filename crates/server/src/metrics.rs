use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// Usage counters exposed on `/metrics`.
///
/// Each instance owns its registry so separate servers (and tests) never share
/// counters.
#[derive(Clone)]
pub struct GalleryMetrics {
    registry: Registry,
    uploads_total: IntCounter,
    listings_total: IntCounter,
    images: IntGauge,
}

impl GalleryMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let uploads_total = IntCounter::with_opts(Opts::new(
            "gallery_uploads_total",
            "Total number of images stored through /upload",
        ))?;
        let listings_total = IntCounter::with_opts(Opts::new(
            "gallery_listings_total",
            "Total number of gallery listings served by /images",
        ))?;
        let images = IntGauge::with_opts(Opts::new(
            "gallery_images",
            "Number of images returned by the most recent listing",
        ))?;

        registry.register(Box::new(uploads_total.clone()))?;
        registry.register(Box::new(listings_total.clone()))?;
        registry.register(Box::new(images.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            uploads_total,
            listings_total,
            images,
        })
    }

    pub fn record_upload(&self) {
        self.uploads_total.inc();
    }

    pub fn record_listing(&self, image_count: usize) {
        self.listings_total.inc();
        self.images.set(i64::try_from(image_count).unwrap_or(i64::MAX));
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
