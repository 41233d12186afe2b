//! Persona text, loaded once and hot-reloadable on admin request.
//!
//! Reads are frequent (every context build); writes happen only when an
//! admin hits the reload endpoint. In-flight requests keep whatever
//! snapshot they already took.

use std::sync::RwLock;

use gryag_core::{GryagError, Result};

pub struct Persona {
    path: String,
    text: RwLock<String>,
}

impl Persona {
    /// Load the persona file. Startup fails when it is unreadable.
    pub fn load(path: &str) -> Result<Self> {
        let text = read_persona(path)?;
        Ok(Self {
            path: path.to_string(),
            text: RwLock::new(text),
        })
    }

    /// Re-read the file. On error the previous persona stays in effect.
    pub fn reload(&self) -> Result<()> {
        let text = read_persona(&self.path)?;
        *self.text.write().unwrap() = text;
        Ok(())
    }

    /// Snapshot of the current persona text.
    pub fn current(&self) -> String {
        self.text.read().unwrap().clone()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn read_persona(path: &str) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| GryagError::Persona(format!("read {path}: {e}")))?;
    if text.trim().is_empty() {
        return Err(GryagError::Persona(format!("{path} is empty")));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_and_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "You are gryag.").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let persona = Persona::load(&path).unwrap();
        assert!(persona.current().contains("gryag"));

        writeln!(file, "Extra instruction.").unwrap();
        file.flush().unwrap();
        persona.reload().unwrap();
        assert!(persona.current().contains("Extra instruction"));
    }

    #[test]
    fn missing_file_fails() {
        assert!(Persona::load("/definitely/not/here.txt").is_err());
    }

    #[test]
    fn empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(Persona::load(file.path().to_str().unwrap()).is_err());
    }
}
