use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::registry::DiseaseRegistry;

/// Name under `model.files` of an optional TOML disease catalog.
pub const DISEASE_CATALOG_FILE: &str = "diseases";

#[derive(Debug)]
pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        if let Some(seed) = input_json.remove("seed") {
            debug!(%seed, "ignoring seed, SIR integration is deterministic");
        }

        if input_json.remove("replicate").is_some() {
            debug!("ignoring replicate, every run is a single deterministic replicate");
        }

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            files,
            output,
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> SimResult<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(SimError::MissingInput("no input on stdin".to_string()));
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> SimResult<Self> {
        Self::from_reader(io::stdin().lock())
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> SimResult<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value)?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    pub fn load() -> SimResult<Self> {
        Environment::from_stdin()?.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input(&self) -> SimResult<&I> {
        self.input
            .as_ref()
            .ok_or_else(|| SimError::MissingInput("input has not been typed".to_string()))
    }

    /// Disease catalog named in `model.files`, or the built-in registry.
    pub fn registry(&self) -> SimResult<DiseaseRegistry> {
        match self.files.get(DISEASE_CATALOG_FILE) {
            Some(path) => {
                debug!(path = %path.display(), "loading disease catalog");
                DiseaseRegistry::load(path)
            }
            None => Ok(DiseaseRegistry::reference()),
        }
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Check profiled output, resolving the default profile
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles
                .get("default")
                .or_else(|| profiles.values().next());
            if let Some(profile) = selected
                && profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem")
                && let Some(dir) = profile.get("dir").and_then(|v| v.as_str())
            {
                return Some(PathBuf::from(dir));
            }
        }

        None
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> SimResult<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(filename), data)?;
        } else {
            io::stdout().lock().write_all(data)?;
        }
        Ok(())
    }

    pub fn write_csv(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> SimResult<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            let file = fs::File::create(dir.join(filename))?;
            write_records(csv::Writer::from_writer(file), headers, rows)
        } else {
            write_records(csv::Writer::from_writer(io::stdout().lock()), headers, rows)
        }
    }
}

fn write_records<W: Write>(
    mut wtr: csv::Writer<W>,
    headers: &[&str],
    rows: &[Vec<String>],
) -> SimResult<()> {
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
