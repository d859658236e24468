use std::path::Path;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Turn a command-line argument into a file URI.
///
/// Arguments that already carry a scheme (`file:`, `http:`, `data:`, ...) pass
/// through unchanged; plain paths are made absolute when possible.
pub fn to_file_uri(arg: &str) -> String {
    if has_scheme(arg) {
        return arg.to_string();
    }
    let path = Path::new(arg);
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn has_scheme(arg: &str) -> bool {
    match arg.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_pass_through() {
        assert_eq!(to_file_uri("file:///tmp/a.jpg"), "file:///tmp/a.jpg");
        assert_eq!(to_file_uri("https://x.test/a.png"), "https://x.test/a.png");
        assert_eq!(to_file_uri("data:,abc"), "data:,abc");
    }

    #[test]
    fn paths_become_file_uris() {
        assert_eq!(to_file_uri("/no/such/clip.mp4"), "file:///no/such/clip.mp4");
        // Windows drive letters are not schemes
        assert!(!has_scheme("C:\\clip.mp4"));
    }
}
