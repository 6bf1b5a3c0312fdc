use std::env;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

const DEFAULT_DIRECTIVES: &str = "tiletree=info";

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init_logging() {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_DIRECTIVES.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    let tree_layer = HierarchicalLayer::default()
        .with_writer(std::io::stderr)
        .with_indent_lines(true)
        .with_targets(true)
        .with_timer(Uptime::default());
    let _ = tracing_subscriber::registry().with(env_filter).with(tree_layer).try_init();
}
