//! Engine instruction assembly.

use std::fmt;

use gifsmith_common::{QualityProfile, Result};

use super::builder::{INPUT_NAME, OUTPUT_NAME};
use super::request::ConversionParams;

/// One step of the engine argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `-ss <start> -t <duration>`
    Trim { start: f64, duration: f64 },
    /// `-i <name>`
    Input(String),
    /// `-vf <chain>`
    Filter(FilterChain),
    /// `-f <format>`
    OutputFormat(String),
    /// Trailing output name.
    Output(String),
}

impl Directive {
    fn push_args(&self, out: &mut Vec<String>) {
        match self {
            Directive::Trim { start, duration } => {
                out.push("-ss".to_string());
                out.push(number(*start));
                out.push("-t".to_string());
                out.push(number(*duration));
            }
            Directive::Input(name) => {
                out.push("-i".to_string());
                out.push(name.clone());
            }
            Directive::Filter(chain) => {
                out.push("-vf".to_string());
                out.push(chain.to_string());
            }
            Directive::OutputFormat(format) => {
                out.push("-f".to_string());
                out.push(format.clone());
            }
            Directive::Output(name) => out.push(name.clone()),
        }
    }
}

/// Two-pass palette filter graph.
///
/// Pass A decimates and rescales, then generates the palette from that stream.
/// Pass B applies the palette to the same decimated, rescaled frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChain {
    pub frame_rate: f64,
    pub width: u32,
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fps={},scale={}:-1:flags=lanczos,split[a][b];[a]palettegen[p];[b][p]paletteuse",
            number(self.frame_rate),
            self.width
        )
    }
}

/// The ordered argument list for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Instructions {
    directives: Vec<Directive>,
    estimated_max_bytes: u64,
}

impl Instructions {
    /// Assemble the directives for already validated `params`.
    pub fn assemble(params: &ConversionParams, profile: &QualityProfile) -> Self {
        let chain = FilterChain {
            frame_rate: f64::from(profile.target_frame_rate),
            width: profile.target_width,
        };

        Self {
            directives: vec![
                Directive::Trim {
                    start: params.start_time,
                    duration: params.duration,
                },
                Directive::Input(INPUT_NAME.to_string()),
                Directive::Filter(chain),
                Directive::OutputFormat("gif".to_string()),
                Directive::Output(OUTPUT_NAME.to_string()),
            ],
            estimated_max_bytes: profile.estimated_max_bytes(params.duration),
        }
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn filter(&self) -> Option<&FilterChain> {
        self.directives.iter().find_map(|d| match d {
            Directive::Filter(chain) => Some(chain),
            _ => None,
        })
    }

    /// Output size upper bound derived from the tier's bitrate ceiling.
    pub fn estimated_max_bytes(&self) -> u64 {
        self.estimated_max_bytes
    }

    /// Flatten into the argument list handed to the engine.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(11);
        for directive in &self.directives {
            directive.push_args(&mut args);
        }
        args
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .to_args()
            .into_iter()
            .map(|arg| {
                if arg.contains(';') || arg.contains('[') {
                    format!("\"{arg}\"")
                } else {
                    arg
                }
            })
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

/// Validate `params` and assemble the instruction list without running it.
pub fn plan(params: &ConversionParams) -> Result<Instructions> {
    params.validate()?;
    Ok(Instructions::assemble(params, params.quality.profile()))
}

/// Seconds and rates without trailing zeros: `5`, `2.5`.
fn number(value: f64) -> String {
    if value == 0.0 {
        // Also covers -0.0.
        return "0".to_string();
    }
    format!("{value}")
}
