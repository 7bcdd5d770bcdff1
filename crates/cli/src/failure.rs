//! Classification of process failures into the kinds reported on stdout.

use serde::Serialize;
use spectra_cloud::CloudError;

/// What went wrong, as far as the caller of the binary is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing or unusable environment / key file.
    Config,
    /// Token exchange rejected or unreachable.
    Auth,
    /// Malformed request JSON, geometry or parameters.
    Input,
    /// Earth Engine rejected or failed the computation.
    Remote,
}

impl FailureKind {
    /// Process exit status; only config and auth failures are non-zero.
    pub fn exit_status(self) -> u8 {
        match self {
            FailureKind::Config | FailureKind::Auth => 1,
            FailureKind::Input | FailureKind::Remote => 0,
        }
    }
}

#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    error: &'a str,
}

impl Failure {
    /// Classify an error by the first library error found in its chain.
    ///
    /// The message is the outermost display only: library errors already
    /// embed their source text.
    pub fn classify(err: &anyhow::Error) -> Self {
        let kind = err
            .chain()
            .find_map(|cause| {
                if let Some(e) = cause.downcast_ref::<CloudError>() {
                    Some(cloud_kind(e))
                } else if cause.is::<spectra_core::Error>() {
                    Some(FailureKind::Input)
                } else {
                    None
                }
            })
            .unwrap_or(FailureKind::Input);

        Self {
            kind,
            message: err.to_string(),
        }
    }

    /// A rejected command line; reported like malformed input.
    pub fn usage(err: &clap::Error) -> Self {
        let rendered = err.to_string();
        let first = rendered.lines().next().unwrap_or_default();
        Self {
            kind: FailureKind::Input,
            message: first.trim_start_matches("error: ").to_string(),
        }
    }

    /// The `{"error": ...}` line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&ErrorLine {
            error: &self.message,
        })
        .unwrap_or_else(|_| r#"{"error":"unprintable error"}"#.to_string())
    }
}

fn cloud_kind(err: &CloudError) -> FailureKind {
    match err {
        CloudError::Config(_) => FailureKind::Config,
        CloudError::Auth(_) => FailureKind::Auth,
        CloudError::Core(_) => FailureKind::Input,
        CloudError::Http(_)
        | CloudError::Network(_)
        | CloudError::Remote { .. }
        | CloudError::Decode(_) => FailureKind::Remote,
    }
}
