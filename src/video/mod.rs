//! Local video composition on top of the `ffmpeg` and `ffprobe` binaries.

pub mod compose;
pub mod ffmpeg;
pub mod materials;
pub mod music;
pub mod params;
pub mod title_card;

pub use compose::{Composition, VideoComposer};
pub use ffmpeg::{FfmpegRunner, FfprobeProbe, MediaProbe, SystemFfmpegRunner};
pub use materials::{Material, collect_materials};
pub use params::{ConcatMode, MaterialInfo, TransitionMode, VideoAspect, VideoParams};
