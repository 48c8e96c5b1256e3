// Domain modules (C1-C11, organized by concern)
pub mod audio;
pub mod config;
pub mod filter;
pub mod inject;
pub mod logging;
pub mod realtime;
pub mod session;

// Utility modules (cross-cutting concerns)
pub mod error;
pub mod http;
pub mod resample;
pub mod verbose;

pub use audio::{AudioDeviceInfo, list_audio_devices};
pub use config::{DictateConfig, TranscriptionModel};
pub use error::{DictateError, Result};
pub use filter::{FilterConfig, FilterEngine};
pub use inject::{InjectError, OutputInjector};
pub use http::{get_http_client, is_http_client_ready, warmup_http_client};
pub use logging::{SessionLogger, SessionMetrics};
pub use realtime::{CloseReason, ConnectionManager, RealtimeError, RealtimeEvent};
pub use session::Session;
pub use verbose::set_verbose;
