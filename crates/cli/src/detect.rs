//! `curricula detect`: thematic detection over free text.

use std::io::Read;
use std::path::PathBuf;

use curricula_analysis::ThematicMatcher;

use crate::config_cmd::load_config;
use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

pub fn cmd_detect(text: String, config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;

    let text = if text == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("cannot read stdin: {}", e)))?;
        buf
    } else {
        text
    };

    let matcher = ThematicMatcher::new(&config);
    let detection = matcher.detect_in_text(&text);

    let json = serde_json::to_string_pretty(&detection)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    println!("{}", json);

    let present: Vec<&str> = detection
        .tematicas
        .iter()
        .filter(|h| h.presente)
        .map(|h| h.nombre.as_str())
        .collect();
    if present.is_empty() {
        eprintln!("no thematics detected");
    } else {
        eprintln!("detected: {}", present.join(", "));
    }
    Ok(())
}
