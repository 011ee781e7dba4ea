use anyhow::Result;
use serde::Serialize;

use super::args::OutputFormat;

pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(text)
}

pub fn emit<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    let text = render(value, format)?;
    println!("{}", text.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_formats() {
        let mut value = BTreeMap::new();
        value.insert("committed", true);

        let json = render(&value, OutputFormat::Json).unwrap();
        assert!(json.contains("\"committed\": true"));

        let yaml = render(&value, OutputFormat::Yaml).unwrap();
        assert_eq!(yaml.trim(), "committed: true");
    }
}
