use std::fmt;
use std::path::{Path, PathBuf};

use crate::capture::frame::{PixelFormat, Resolution};
use crate::capture::policy::{format_label, resolve_codec_profile, CodecProfile, OutputFormat};
use crate::capture::settings::CaptureSettings;
use crate::error::CaptureError;
use crate::utils::next_pass_output_path;

/// Output written by one encoder process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderOutput {
    ProRes(CodecProfile),
    /// Numbered stills, `-q:v 0`
    ImageSequence,
}

/// Builds the argument list for a raw-video encoder reading from stdin.
#[derive(Debug, Clone)]
pub struct EncoderCommandBuilder {
    input_format: PixelFormat,
    input_size: Resolution,
    framerate: u32,
    output_size: Resolution,
    output: EncoderOutput,
}

impl EncoderCommandBuilder {
    pub fn new(input_size: Resolution) -> Self {
        Self {
            input_format: PixelFormat::Bgra8,
            input_size,
            framerate: 60,
            output_size: input_size,
            output: EncoderOutput::ImageSequence,
        }
    }

    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    /// Size the encoder scales every frame to
    pub fn with_output_size(mut self, size: Resolution) -> Self {
        self.output_size = size;
        self
    }

    pub fn with_output(mut self, output: EncoderOutput) -> Self {
        self.output = output;
        self
    }

    pub fn build(&self, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            self.input_format.encoder_name().to_string(),
            "-s".to_string(),
            self.input_size.to_string(),
            "-r".to_string(),
            self.framerate.to_string(),
            "-i".to_string(),
            "-".to_string(),
        ];

        match &self.output {
            EncoderOutput::ProRes(profile) => args.extend([
                "-c:v".to_string(),
                "prores".to_string(),
                "-profile:v".to_string(),
                profile.profile.to_string(),
                "-q:v".to_string(),
                "1".to_string(),
                "-pix_fmt".to_string(),
                profile.pixel_format.to_string(),
            ]),
            EncoderOutput::ImageSequence => {
                args.extend(["-q:v".to_string(), "0".to_string()])
            }
        }

        args.extend([
            "-vf".to_string(),
            format!("scale={}:{}", self.output_size.width, self.output_size.height),
            "-y".to_string(),
            output_path.to_string_lossy().into_owned(),
        ]);

        args
    }
}

/// A fully resolved encoder process for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub pass_index: usize,
    /// Output file, or the numbered pattern for image sequences
    pub output: PathBuf,
}

impl fmt::Display for EncoderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Encoder command for `pass_index` of a capture at `screen` resolution.
pub fn build_invocation(
    program: &Path,
    settings: &CaptureSettings,
    output_dir: &Path,
    screen: Resolution,
    pass_index: usize,
) -> Result<EncoderInvocation, CaptureError> {
    let builder = EncoderCommandBuilder::new(screen)
        .with_framerate(settings.framerate.get())
        .with_output_size(settings.resolution.unwrap_or(screen));

    let (builder, output) = match settings.output_format {
        OutputFormat::ImageSequence => (
            builder.with_output(EncoderOutput::ImageSequence),
            output_dir.join(format!("output_{pass_index}_%06d.tga")),
        ),
        OutputFormat::Video => (
            builder.with_output(EncoderOutput::ProRes(resolve_codec_profile(
                settings.video_codec,
            ))),
            next_pass_output_path(output_dir, pass_index, "mov"),
        ),
        other @ (OutputFormat::CameraData | OutputFormat::Unknown) => {
            return Err(CaptureError::UnsupportedFormat(format_label(other)));
        }
    };

    Ok(EncoderInvocation {
        program: program.to_path_buf(),
        args: builder.build(&output),
        pass_index,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::policy::VideoCodec;
    use std::num::NonZeroU32;
    use tempfile::tempdir;

    fn settings(format: OutputFormat) -> CaptureSettings {
        CaptureSettings {
            output_format: format,
            video_codec: Some(VideoCodec::Prores422HQ),
            resolution: Some(Resolution::new(960, 540)),
            framerate: NonZeroU32::new(60).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn video_command() {
        let dir = tempdir().unwrap();
        let invocation = build_invocation(
            Path::new("ffmpeg"),
            &settings(OutputFormat::Video),
            dir.path(),
            Resolution::new(1920, 1080),
            1,
        )
        .unwrap();

        let out = dir.path().join("Pass 1.mov");
        let expected: Vec<String> = [
            "-f", "rawvideo", "-pix_fmt", "bgra", "-s", "1920x1080", "-r", "60", "-i", "-",
            "-c:v", "prores", "-profile:v", "3", "-q:v", "1", "-pix_fmt", "yuv422p10le",
            "-vf", "scale=960:540", "-y",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(out.to_string_lossy().into_owned()))
        .collect();

        assert_eq!(invocation.args, expected);
        assert_eq!(invocation.output, out);
        assert_eq!(invocation.pass_index, 1);
    }

    #[test]
    fn image_sequence_command() {
        let dir = tempdir().unwrap();
        let invocation = build_invocation(
            Path::new("ffmpeg"),
            &settings(OutputFormat::ImageSequence),
            dir.path(),
            Resolution::new(1280, 720),
            2,
        )
        .unwrap();

        assert_eq!(invocation.output, dir.path().join("output_2_%06d.tga"));
        let q = invocation.args.iter().position(|a| a == "-q:v").unwrap();
        assert_eq!(invocation.args[q + 1], "0");
        assert!(!invocation.args.iter().any(|a| a == "prores"));
    }

    #[test]
    fn camera_data_has_no_encoder() {
        let err = build_invocation(
            Path::new("ffmpeg"),
            &settings(OutputFormat::CameraData),
            Path::new("."),
            Resolution::new(1280, 720),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat("Camera Data")));
    }

    #[test]
    fn display_quotes_spaced_args() {
        let invocation = EncoderInvocation {
            program: PathBuf::from("ffmpeg"),
            args: vec!["-y".into(), "out/Pass 0.mov".into()],
            pass_index: 0,
            output: PathBuf::from("out/Pass 0.mov"),
        };
        assert_eq!(invocation.to_string(), "ffmpeg -y \"out/Pass 0.mov\"");
    }
}
