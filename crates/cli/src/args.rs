use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use speedtrap_core::geometry::Point;
use speedtrap_core::settings::{
    DetectionConfig, DEFAULT_CALC_DISTANCE, DEFAULT_SPEED_LIMIT, DEFAULT_TRACKING_SENSITIVITY,
};

/// Speed-trap client: annotate detection zones on a traffic video and
/// submit it for analysis, or run a live monitoring session.
#[derive(Parser, Debug)]
#[command(name = "speedtrap", author, version, about, long_about = None)]
pub struct Cli {
    /// Analysis service base URL (overrides `ANALYSIS_API_URL`)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Submission timeout in seconds (overrides `SUBMIT_TIMEOUT_SECS`)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture one still at native resolution
    Capture(CaptureArgs),
    /// Draw both zones on a captured still and write the overlay
    Annotate(AnnotateArgs),
    /// Annotate a video and submit it for analysis
    Submit(SubmitArgs),
    /// Record a live feed and fetch the consolidated analysis
    Monitor(MonitorArgs),
    /// Query the analysis service status
    Status,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Source video (mp4, avi, mov, mkv)
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Where to write the PNG still
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Playback position to capture, in seconds
    #[arg(long, default_value = "0", value_name = "SECS")]
    pub at: f64,
}

/// Entry and exit zone vertices in display space.
#[derive(Args, Debug)]
pub struct ZoneArgs {
    /// Entry zone points, `x,y;x,y;...`
    #[arg(long, value_name = "POINTS")]
    pub entry: PointList,

    /// Exit zone points, `x,y;x,y;...`
    #[arg(long, value_name = "POINTS")]
    pub exit: PointList,
}

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    #[command(flatten)]
    pub zones: ZoneArgs,

    /// Where to write the annotated PNG
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    #[arg(long, default_value = "0", value_name = "SECS")]
    pub at: f64,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    #[command(flatten)]
    pub zones: ZoneArgs,

    #[arg(long, default_value = "0", value_name = "SECS")]
    pub at: f64,

    /// Tracker sensitivity (10-100)
    #[arg(long, default_value_t = DEFAULT_TRACKING_SENSITIVITY)]
    pub tracking_sens: u32,

    /// Speed limit in km/h
    #[arg(long, default_value_t = DEFAULT_SPEED_LIMIT)]
    pub speed_limit: f64,

    /// Distance between the zones in metres
    #[arg(long, default_value_t = DEFAULT_CALC_DISTANCE)]
    pub calc_distance: f64,
}

impl SubmitArgs {
    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            tracking_sensitivity: self.tracking_sens,
            speed_limit: self.speed_limit,
            calc_distance: self.calc_distance,
        }
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// ffmpeg input: capture device, file or stream URL
    #[arg(long, default_value = "/dev/video0", value_name = "SOURCE")]
    pub input: String,

    /// ffmpeg input format, e.g. `v4l2` or `x11grab`
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,
}

/// Display-space polygon given as `x,y;x,y;...`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointList(pub Vec<Point>);

impl FromStr for PointList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (x, y) = pair
                    .split_once(',')
                    .ok_or_else(|| format!("expected `x,y`, got `{pair}`"))?;
                let coord = |v: &str| {
                    v.trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|c| c.is_finite() && *c >= 0.0)
                        .ok_or_else(|| format!("invalid coordinate `{v}` in `{pair}`"))
                };
                Ok(Point::new(coord(x)?, coord(y)?))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PointList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_separated_pairs() {
        let list: PointList = "10,10; 100,10;100.5,100".parse().unwrap();
        assert_eq!(
            list.0,
            vec![
                Point::new(10.0, 10.0),
                Point::new(100.0, 10.0),
                Point::new(100.5, 100.0)
            ]
        );
    }

    #[test]
    fn trailing_separator_is_ignored() {
        let list: PointList = "1,2;".parse().unwrap();
        assert_eq!(list.0.len(), 1);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!("10;20".parse::<PointList>().is_err());
        assert!("10,abc".parse::<PointList>().is_err());
        assert!("-1,5".parse::<PointList>().is_err());
    }

    #[test]
    fn cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "speedtrap",
            "submit",
            "road.mp4",
            "--entry",
            "10,10;100,10;100,100",
            "--exit",
            "200,200;300,200;300,300",
            "--speed-limit",
            "50",
        ])
        .unwrap();
        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.zones.exit.0.len(), 3);
        assert_eq!(args.detection_config().speed_limit, 50.0);
        assert_eq!(args.detection_config().tracking_sensitivity, 30);
    }
}
