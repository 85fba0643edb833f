pub mod host_policy;
pub mod metrics;
pub mod preprocess;
pub mod providers;
pub mod ssl_labs;

pub use host_policy::{check_host, HostCheck};
pub use metrics::{get_metrics, init_metrics};
pub use providers::{ProviderError, RecognitionProvider};
pub use ssl_labs::{GradingClient, GradingError, SslLabsClient};
