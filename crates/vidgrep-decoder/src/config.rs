use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::{DecoderError, DecoderResult, DynFrameSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mock,
    Ffmpeg,
}

impl FromStr for Backend {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Backend::Mock),
            "ffmpeg" => Ok(Backend::Ffmpeg),
            other => Err(DecoderError::configuration(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Mock => "mock",
            Backend::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compiled_backends() -> Vec<Backend> {
    let mut backends = Vec::new();
    #[cfg(feature = "backend-ffmpeg")]
    {
        backends.push(Backend::Ffmpeg);
    }
    #[cfg(feature = "backend-mock")]
    {
        backends.push(Backend::Mock);
    }
    backends
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub backend: Backend,
    pub input: Option<PathBuf>,
    /// Frame count reported by the mock backend; ignored elsewhere.
    pub mock_frame_count: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        let backend = compiled_backends()
            .into_iter()
            .next()
            .unwrap_or(Backend::Ffmpeg);
        Self {
            backend,
            input: None,
            mock_frame_count: None,
        }
    }
}

impl Configuration {
    pub fn from_env() -> DecoderResult<Self> {
        let mut config = Configuration::default();
        if let Ok(backend) = env::var("VIDGREP_BACKEND") {
            config.backend = Backend::from_str(&backend)?;
        }
        if let Ok(path) = env::var("VIDGREP_INPUT") {
            config.input = Some(PathBuf::from(path));
        }
        Ok(config)
    }

    pub fn available_backends() -> Vec<Backend> {
        compiled_backends()
    }

    pub fn create_source(&self) -> DecoderResult<DynFrameSource> {
        tracing::debug!(backend = %self.backend, input = ?self.input, "opening frame source");
        match self.backend {
            Backend::Mock => {
                #[cfg(feature = "backend-mock")]
                {
                    crate::backends::mock::boxed_mock(self)
                }
                #[cfg(not(feature = "backend-mock"))]
                {
                    Err(DecoderError::unsupported("mock"))
                }
            }
            Backend::Ffmpeg => {
                #[cfg(feature = "backend-ffmpeg")]
                {
                    let path = self.input.clone().ok_or_else(|| {
                        DecoderError::configuration("ffmpeg backend requires an input path")
                    })?;
                    crate::backends::ffmpeg::boxed_ffmpeg(path)
                }
                #[cfg(not(feature = "backend-ffmpeg"))]
                {
                    Err(DecoderError::unsupported("ffmpeg"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_round_trip_case_insensitively() {
        assert_eq!(Backend::from_str("FFmpeg").unwrap(), Backend::Ffmpeg);
        assert_eq!(Backend::from_str(" mock ").unwrap(), Backend::Mock);
        assert!(matches!(
            Backend::from_str("gstreamer"),
            Err(DecoderError::Configuration { .. })
        ));
    }

    #[cfg(feature = "backend-mock")]
    #[test]
    fn mock_backend_honors_frame_count_override() {
        let config = Configuration {
            backend: Backend::Mock,
            input: None,
            mock_frame_count: Some(5),
        };
        let source = config.create_source().unwrap();
        assert_eq!(source.frame_count(), 5);
        assert_eq!(source.name(), "mock");
    }
}
