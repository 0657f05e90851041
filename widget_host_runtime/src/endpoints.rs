use url::Url;

/// Resolves resource paths the server hands out into absolute URLs.
pub trait Endpoints {
    fn build_media_url(&self, path: &str) -> String;

    fn build_component_url(&self, component_name: &str, path: &str) -> String;
}

/// Resolves everything relative to the app server's base URL.
#[derive(Debug, Clone)]
pub struct BaseUrlEndpoints {
    base: Url,
}

impl BaseUrlEndpoints {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        Url::parse(base).map(Self::new)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, path: &str) -> String {
        if Url::parse(path).is_ok() {
            return path.to_string();
        }

        match self.base.join(path.trim_start_matches('/')) {
            Ok(url) => url.to_string(),
            Err(err) => {
                log::warn!("cannot resolve {path:?} against {}: {err}", self.base);
                path.to_string()
            }
        }
    }
}

impl Endpoints for BaseUrlEndpoints {
    fn build_media_url(&self, path: &str) -> String {
        self.resolve(path)
    }

    fn build_component_url(&self, component_name: &str, path: &str) -> String {
        self.resolve(&format!("component/{component_name}/{path}"))
    }
}
