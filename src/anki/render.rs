use std::{path::{Path, PathBuf}, process::{Command, Output}};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use fs_err as fs;
use tracing::{debug, instrument, warn};

use crate::error::RenderError;

/// Turns a derived card file into an embeddable, base64 encoded image.
pub trait Renderer {
	fn render(&self, tex: &Path) -> Result<String, RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
	fn render(&self, tex: &Path) -> Result<String, RenderError> { (**self).render(tex) }
}

/// Programs the pipeline runs, looked up on `PATH` unless given as paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
	pub latexmk: PathBuf,
	pub pdfcrop: PathBuf,
	pub pdf2svg: PathBuf,
}

impl Default for Toolchain {
	fn default() -> Self {
		Self { latexmk: "latexmk".into(), pdfcrop: "pdfcrop".into(), pdf2svg: "pdf2svg".into() }
	}
}

/// `latexmk` -> `pdfcrop` -> `pdf2svg`, run in a scratch directory.
///
/// In force mode a failing `latexmk` is tolerated as long as it still
/// produced a PDF.
#[derive(Debug, Clone)]
pub struct LatexPipeline {
	pub force: bool,
	pub tools: Toolchain,
}

impl Default for LatexPipeline {
	fn default() -> Self { Self { force: true, tools: Toolchain::default() } }
}

fn run(tool: &'static str, command: &mut Command) -> Result<Output, RenderError> {
	let output = command.output().map_err(|source| RenderError::Spawn { tool, source })?;
	debug!("{} exited with {}", tool, output.status);
	Ok(output)
}

fn require(tool: &'static str, output: Output) -> Result<(), RenderError> {
	if output.status.success() {
		Ok(())
	} else {
		Err(RenderError::Tool { tool, status: output.status })
	}
}

impl Renderer for LatexPipeline {
	#[instrument(skip(self))]
	fn render(&self, tex: &Path) -> Result<String, RenderError> {
		let scratch = tempfile::Builder::new().prefix("zettelsync-").tempdir()?;
		let dir: &Path = scratch.path();
		let compiled = dir.join("pdfout.pdf");
		let cropped = dir.join("cropped.pdf");
		let vector = dir.join("svgout.svg");

		let mut outdir = std::ffi::OsString::from("-outdir=");
		outdir.push(dir);
		let latexmk = run(
			"latexmk",
			Command::new(&self.tools.latexmk).args(["-f", "-pdf", "-cd"]).arg(outdir).arg("-jobname=pdfout").arg(tex),
		)?;
		if !latexmk.status.success() {
			if self.force {
				warn!("latexmk exited with {} for {:?}", latexmk.status, tex);
			} else {
				return Err(RenderError::Tool { tool: "latexmk", status: latexmk.status });
			}
		}
		if !compiled.exists() {
			return Err(RenderError::Missing(compiled));
		}

		require("pdfcrop", run("pdfcrop", Command::new(&self.tools.pdfcrop).arg(&compiled).arg(&cropped))?)?;
		require("pdf2svg", run("pdf2svg", Command::new(&self.tools.pdf2svg).arg(&cropped).arg(&vector))?)?;
		if !vector.exists() {
			return Err(RenderError::Missing(vector));
		}

		let encoded = STANDARD.encode(fs::read(&vector)?);
		scratch.close()?;
		Ok(encoded)
	}
}
