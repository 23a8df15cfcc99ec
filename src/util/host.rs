use log::warn;

/// Build a metric name prefix of the form `base.hostname`
///
/// Graphite treats dots as path separators, so dots in the hostname are
/// replaced with underscores (`web1.example.com` becomes
/// `web1_example_com`). If the hostname cannot be determined the base is
/// returned alone.
pub fn hostname_prefix(base: &str) -> String {
    match hostname::get() {
        Ok(name) => format!("{}.{}", base, sanitise(&name.to_string_lossy())),
        Err(e) => {
            warn!("Could not determine hostname: {}", e);
            base.to_string()
        }
    }
}

/// Replace characters Graphite would interpret as path structure
fn sanitise(host: &str) -> String {
    host.chars()
        .map(|c| match c {
            '.' | ' ' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitise_replaces_dots() {
        assert_eq!(sanitise("web1.example.com"), "web1_example_com");
        assert_eq!(sanitise("plain"), "plain");
    }

    #[test]
    fn test_prefix_starts_with_base() {
        let prefix = hostname_prefix("servers");
        assert!(prefix.starts_with("servers"));
        // Whatever the host is called, the base and name stay dot-separated
        assert!(prefix == "servers" || prefix.split('.').count() == 2);
    }
}
