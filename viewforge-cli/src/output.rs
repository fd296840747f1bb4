use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use viewforge_chat::{CampaignOutput, Transcript};

pub const CHAT_HISTORY_FILE: &str = "chat_history.jsonl";
pub const CODE_HISTORY_FILE: &str = "code_history.sql";

#[derive(Debug)]
pub struct OutputPaths {
    pub chat_history: PathBuf,
    pub code_history: PathBuf,
}

/// Writes the campaign artifacts into `dir`, creating it if needed.
pub fn write_outputs(dir: &Path, output: &CampaignOutput) -> anyhow::Result<OutputPaths> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let paths = OutputPaths {
        chat_history: dir.join(CHAT_HISTORY_FILE),
        code_history: dir.join(CODE_HISTORY_FILE),
    };
    write_chat_history(&paths.chat_history, &output.transcripts)?;
    write_code_history(&paths.code_history, &output.view_code)?;
    Ok(paths)
}

/// One JSON array of turns per line, one line per session.
fn write_chat_history(path: &Path, transcripts: &[Transcript]) -> anyhow::Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for transcript in transcripts {
        serde_json::to_writer(&mut writer, transcript)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Code blocks separated by a blank line.
fn write_code_history(path: &Path, blocks: &[String]) -> anyhow::Result<()> {
    let mut text = blocks.join("\n\n");
    if !text.is_empty() {
        text.push('\n');
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
