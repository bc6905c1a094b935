use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

/// Crop rectangle in source-stream pixel coordinates: `x,y,w,h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropArg {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

impl FromStr for CropArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(format!("expected x,y,w,h, got `{s}`"));
        };
        Ok(CropArg {
            x: x.parse().map_err(|_| format!("bad x in `{s}`"))?,
            y: y.parse().map_err(|_| format!("bad y in `{s}`"))?,
            w: w.parse().map_err(|_| format!("bad w in `{s}`"))?,
            h: h.parse().map_err(|_| format!("bad h in `{s}`"))?,
        })
    }
}

/// Tile-grid alignment offset in pixels: `dx,dy`, each `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOffsetArg {
    pub dx: u8,
    pub dy: u8,
}

impl FromStr for GridOffsetArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let [dx, dy] = parts.as_slice() else {
            return Err(format!("expected dx,dy, got `{s}`"));
        };
        Ok(GridOffsetArg {
            dx: dx.parse().map_err(|_| format!("bad dx in `{s}`"))?,
            dy: dy.parse().map_err(|_| format!("bad dy in `{s}`"))?,
        })
    }
}

/// Real-time NES Zelda 1 game-state extraction from a decoded video stream.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Racer identifier; used as the HTTP path segment and snapshot filename.
    #[arg(long)]
    pub racer: String,

    /// Crop rectangle in source-stream pixel coordinates: `x,y,w,h`.
    #[arg(long)]
    pub crop: Option<CropArg>,

    /// Tile-grid alignment offset in pixels: `dx,dy`.
    #[arg(long)]
    pub grid_offset: Option<GridOffsetArg>,

    /// Source stream frame width, in pixels.
    #[arg(long)]
    pub width: u32,

    /// Source stream frame height, in pixels.
    #[arg(long)]
    pub height: u32,

    /// Directory of reference templates (digits/items/drops/enemies).
    #[arg(long, default_value = "templates")]
    pub templates: PathBuf,

    /// Dashboard base URL state deltas and reports are POSTed to.
    #[arg(long)]
    pub server: Option<String>,

    /// Path to a JSON file of named HUD landmark rectangles.
    ///
    /// Accepted for compatibility with persisted crop profiles; the
    /// grid-based `HudReader` fallback this pipeline uses does not
    /// currently consult landmark overrides.
    #[arg(long)]
    pub landmarks: Option<PathBuf>,

    /// Crop-profile id to `PUT` after calibration completes.
    #[arg(long)]
    pub crop_profile_id: Option<String>,

    /// Directory file outputs (snapshots, reports) are written under.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Run in learn mode: accumulate a `LearnReport` over the whole stream
    /// and POST/write it at EOF, instead of streaming per-frame deltas.
    #[arg(long)]
    pub learn: bool,

    /// Learn-mode session id; required when `--learn` is set.
    #[arg(long)]
    pub session_id: Option<String>,

    /// Learn-mode snapshot interval, in frames.
    #[arg(long, default_value_t = 1800)]
    pub snapshot_interval_frames: u64,

    /// Increase log verbosity (stacks: `-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_arg_parses_four_comma_separated_integers() {
        let crop: CropArg = "100,50,512,480".parse().unwrap();
        assert_eq!(crop, CropArg { x: 100, y: 50, w: 512, h: 480 });
    }

    #[test]
    fn crop_arg_rejects_wrong_field_count() {
        assert!("100,50,512".parse::<CropArg>().is_err());
    }

    #[test]
    fn grid_offset_arg_parses_two_components() {
        let offset: GridOffsetArg = "3,5".parse().unwrap();
        assert_eq!(offset, GridOffsetArg { dx: 3, dy: 5 });
    }
}
