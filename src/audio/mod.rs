//! Local audio tooling: fetching audio by search query and probing files.

mod fetcher;
mod probe;

pub use fetcher::{AudioFetchError, AudioFetcher, YtDlpFetcher};
pub use probe::{round_to_hundredths, AudioProbe, FfprobeProbe, ProbeError};
