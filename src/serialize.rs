//! Canonical writer for the logical config.
//!
//! This is the conventional half of the crate: parse into [`NuGetConfig`],
//! change it, write it out fresh. Formatting and comments of the original are
//! not kept; use [`crate::ConfigEditor`] for that.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::error::Result;
use crate::index::paths;
use crate::model::{KeyValue, NuGetConfig, encode_local_name};

/// Serialize `config` as a complete `NuGet.Config` document.
///
/// Sections are written in a fixed order with two-space indentation. Empty
/// optional sections are omitted; `packageSources` is always present.
pub fn to_xml(config: &NuGetConfig) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(paths::CONFIGURATION)))?;

    if config.package_sources.is_empty() && !config.clear_sources {
        writer.write_event(Event::Empty(BytesStart::new(paths::PACKAGE_SOURCES)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(paths::PACKAGE_SOURCES)))?;
        if config.clear_sources {
            writer.write_event(Event::Empty(BytesStart::new("clear")))?;
        }
        for source in &config.package_sources {
            let mut add = BytesStart::new("add");
            add.push_attribute(("key", source.key.as_str()));
            add.push_attribute(("value", source.value.as_str()));
            if let Some(version) = &source.protocol_version {
                add.push_attribute(("protocolVersion", version.as_str()));
            }
            writer.write_event(Event::Empty(add))?;
        }
        writer.write_event(Event::End(BytesEnd::new(paths::PACKAGE_SOURCES)))?;
    }

    if !config.credentials.is_empty() {
        writer.write_event(Event::Start(BytesStart::new(paths::CREDENTIALS)))?;
        for (source, credential) in config.credentials.iter() {
            let name = encode_local_name(source);
            let fields: Vec<(&str, &str)> = credential.fields().collect();
            if fields.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new(name.as_str())))?;
                continue;
            }
            writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
            for (key, value) in fields {
                write_entry(&mut writer, key, value)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(paths::CREDENTIALS)))?;
    }

    write_section(&mut writer, paths::CONFIG, &config.options)?;
    write_section(&mut writer, paths::DISABLED_SOURCES, &config.disabled_sources)?;
    if let Some(active) = &config.active_source {
        write_section(&mut writer, paths::ACTIVE_SOURCE, std::slice::from_ref(active))?;
    }

    writer.write_event(Event::End(BytesEnd::new(paths::CONFIGURATION)))?;

    let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    xml.push('\n');
    Ok(xml)
}

fn write_section(writer: &mut Writer<Vec<u8>>, name: &str, entries: &[KeyValue]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    for entry in entries {
        write_entry(writer, &entry.key, &entry.value)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_entry(writer: &mut Writer<Vec<u8>>, key: &str, value: &str) -> Result<()> {
    let mut add = BytesStart::new("add");
    add.push_attribute(("key", key));
    add.push_attribute(("value", value));
    writer.write_event(Event::Empty(add))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PackageSource, SourceCredential};
    use crate::parser::parse;

    fn sample() -> NuGetConfig {
        let mut config = NuGetConfig {
            package_sources: vec![
                PackageSource::new("nuget.org", "https://api.nuget.org/v3/index.json")
                    .with_protocol_version("3"),
                PackageSource::new("local", "C:\\feeds & more"),
            ],
            clear_sources: true,
            options: vec![KeyValue::new("globalPackagesFolder", "/packages")],
            disabled_sources: vec![KeyValue::new("local", "true")],
            active_source: Some(KeyValue::new("nuget.org", "https://api.nuget.org/v3/index.json")),
            ..Default::default()
        };
        config.credentials.insert(
            "My Feed",
            SourceCredential {
                username: Some("me".into()),
                clear_text_password: Some("p<a>ss\"word".into()),
                ..Default::default()
            },
        );
        config.credentials.insert("empty", SourceCredential::default());
        config
    }

    #[test]
    fn test_round_trip() {
        let config = sample();
        let xml = to_xml(&config).unwrap();

        assert_eq!(parse(xml.as_bytes()).unwrap(), config);
    }

    #[test]
    fn test_writes_declaration_and_encoded_names() {
        let xml = to_xml(&sample()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<My_x0020_Feed>"));
        assert!(xml.contains("&amp; more"));
        assert!(xml.ends_with("</configuration>\n"));
    }

    #[test]
    fn test_empty_config_keeps_package_sources() {
        let xml = to_xml(&NuGetConfig::default()).unwrap();
        let parsed = parse(xml.as_bytes()).unwrap();

        assert!(xml.contains("<packageSources/>"));
        assert_eq!(parsed, NuGetConfig::default());
    }
}
