use std::io::ErrorKind;

use super::UrlOpener;
use crate::error::OpenError;

/// Hands URLs to the desktop's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        open::that(url).map_err(|err| launch_error(url, err))
    }
}

fn launch_error(url: &str, err: std::io::Error) -> OpenError {
    match err.kind() {
        ErrorKind::PermissionDenied => OpenError::Blocked(url.to_string()),
        _ => OpenError::Failed {
            url: url.to_string(),
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io;

    #[test]
    fn permission_denied_counts_as_blocked() {
        let err = io::Error::new(ErrorKind::PermissionDenied, "sandboxed");
        assert_matches!(launch_error("https://a", err), OpenError::Blocked(url) if url == "https://a");
    }

    #[test]
    fn other_launch_errors_keep_the_reason() {
        let err = io::Error::new(ErrorKind::NotFound, "no handler");
        assert_matches!(
            launch_error("https://a", err),
            OpenError::Failed { url, reason } if url == "https://a" && reason == "no handler"
        );
    }
}
