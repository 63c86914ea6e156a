//! Publishing of prepared data.
//!
//! Writes per-series CSV files for the chart renderer, fills the index page
//! template with the summary, and writes gzip and brotli copies of the page.

use anyhow::{Context, Result};
use brotli::enc::backward_references::{BrotliEncoderMode, BrotliEncoderParams};
use csv::Writer;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzers::pipeline::PreparedData;
use crate::analyzers::types::{Metric, Summary, Unit};

/// Static files copied next to the index page when present.
pub const ASSETS: &[&str] = &["app.manifest", "logo192.png", "logo512.png", "example.png"];

/// Logs prepared data as pretty-printed JSON.
pub fn print_json(prepared: &PreparedData) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(prepared)?);
    Ok(())
}

/// Writes prepared data as JSON to `path`.
pub fn write_json(path: &Path, prepared: &PreparedData) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_vec(prepared)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

/// File name for a country: spaces, commas and slashes become `_`, and runs
/// of `_` collapse into one.
pub fn country_file_name(country: &str) -> String {
    let mut name = String::with_capacity(country.len());
    for c in country.chars() {
        let c = if matches!(c, ' ' | ',' | '/') { '_' } else { c };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }
    name
}

/// Path of one leaf series below `root`.
pub fn series_path(root: &Path, unit: Unit, metric: Metric, continent: &str, country: &str) -> PathBuf {
    root.join("series")
        .join(unit.as_str())
        .join(metric.as_str())
        .join(continent)
        .join(format!("{}.csv", country_file_name(country)))
}

/// Writes one `week,value` CSV per existing leaf series. Returns the number
/// of files written.
#[tracing::instrument(skip(prepared), fields(root = %root.display()))]
pub fn write_series(root: &Path, prepared: &PreparedData) -> Result<usize> {
    let weeks = prepared.weeks.as_slice();
    let mut written = 0;

    for unit in Unit::ALL {
        for metric in Metric::ALL {
            for (continent, countries) in &prepared.series {
                for (country, series) in countries {
                    let Some(values) = series.unit(unit).get(&metric) else {
                        continue;
                    };
                    let path = series_path(root, unit, metric, continent, country);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create {}", parent.display()))?;
                    }
                    let mut writer = Writer::from_path(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    writer.write_record(["week", "value"])?;
                    for (index, value) in values.iter().enumerate() {
                        let week = weeks.get(index).map(String::as_str).unwrap_or("");
                        writer.serialize((week, value))?;
                    }
                    writer.flush()?;
                    written += 1;
                }
            }
        }
    }

    info!(files = written, "Series written");
    Ok(written)
}

/// Serializes the summary for embedding in a page script.
pub fn summary_literal(summary: &Summary) -> Result<String> {
    Ok(serde_json::to_string(summary)?.replace('<', "\\u003c"))
}

/// Replaces the first `start ... end` span of `text`, both markers included.
fn replace_span(text: &str, start: &str, end: char, replacement: &str) -> Option<String> {
    let from = text.find(start)?;
    let to = from + start.len() + text[from + start.len()..].find(end)? + end.len_utf8();
    Some(format!("{}{}{}", &text[..from], replacement, &text[to..]))
}

/// Fills the index page template.
///
/// The template carries `max = {...}`, `lastWeek = '...'` and
/// `Version 1.0.0` literals which are replaced by the summary, the last week
/// and `version`. Missing literals are left alone.
pub fn render_index(
    template: &str,
    summary: &Summary,
    last_week: &str,
    version: &str,
) -> Result<String> {
    let mut page = template.to_string();

    let max = format!("max = {}", summary_literal(summary)?);
    match replace_span(&page, "max = {", '}', &max) {
        Some(replaced) => page = replaced,
        None => warn!("Template has no summary placeholder"),
    }

    let week = format!("lastWeek = '{last_week}'");
    match replace_span(&page, "lastWeek = '", '\'', &week) {
        Some(replaced) => page = replaced,
        None => warn!("Template has no last week placeholder"),
    }

    Ok(page.replacen("Version 1.0.0", &format!("Version {version}"), 1))
}

/// Renders `template.html` from `internal_dir` into `public_dir/index.html`
/// and writes gzip and brotli copies next to it.
#[tracing::instrument(skip(prepared), fields(internal_dir = %internal_dir.display(), public_dir = %public_dir.display()))]
pub fn write_index(
    internal_dir: &Path,
    public_dir: &Path,
    prepared: &PreparedData,
    version: &str,
) -> Result<PathBuf> {
    let template_path = internal_dir.join("template.html");
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("failed to read {}", template_path.display()))?;
    let page = render_index(
        &template,
        &prepared.summary,
        prepared.weeks.last().unwrap_or(""),
        version,
    )?;

    fs::create_dir_all(public_dir)?;
    let index_path = public_dir.join("index.html");
    fs::write(&index_path, page)
        .with_context(|| format!("failed to write {}", index_path.display()))?;
    compress_gzip(&index_path)?;
    compress_brotli(&index_path)?;
    Ok(index_path)
}

/// Writes `<path>.gz` with maximum compression.
pub fn compress_gzip(path: &Path) -> Result<PathBuf> {
    let contents = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&contents)?;
    let compressed = encoder.finish()?;

    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");
    let gz_path = PathBuf::from(gz_path);
    fs::write(&gz_path, &compressed)
        .with_context(|| format!("failed to write {}", gz_path.display()))?;
    debug!(
        original = contents.len(),
        compressed = compressed.len(),
        "Compressed {}",
        path.display()
    );
    Ok(gz_path)
}

/// Writes `<path>.br` at maximum quality, tuned for text.
pub fn compress_brotli(path: &Path) -> Result<PathBuf> {
    let contents = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let params = BrotliEncoderParams {
        quality: 11,
        mode: BrotliEncoderMode::BROTLI_MODE_TEXT,
        size_hint: contents.len(),
        ..Default::default()
    };
    let mut compressed = Vec::new();
    brotli::BrotliCompress(&mut contents.as_slice(), &mut compressed, &params)
        .with_context(|| format!("failed to compress {}", path.display()))?;

    let mut br_path = path.as_os_str().to_owned();
    br_path.push(".br");
    let br_path = PathBuf::from(br_path);
    fs::write(&br_path, &compressed)
        .with_context(|| format!("failed to write {}", br_path.display()))?;
    debug!(
        original = contents.len(),
        compressed = compressed.len(),
        "Brotli compressed {}",
        path.display()
    );
    Ok(br_path)
}

/// Copies the static assets that exist in `internal_dir` into `public_dir`.
pub fn copy_assets(internal_dir: &Path, public_dir: &Path) -> Result<usize> {
    fs::create_dir_all(public_dir)?;
    let mut copied = 0;
    for name in ASSETS {
        let from = internal_dir.join(name);
        if !from.exists() {
            debug!(asset = name, "Asset not present, skipping");
            continue;
        }
        fs::copy(&from, public_dir.join(name))
            .with_context(|| format!("failed to copy {}", from.display()))?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::pipeline::{PipelineOptions, run};
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::env;
    use std::io::Read;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("epi_weekly_output_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn prepared() -> PreparedData {
        let primary = vec![
            json!({
                "countriesAndTerritories": "Bonaire, Saint Eustatius and Saba",
                "continentExp": "America",
                "popData2019": 25983,
                "year_week": "2020-01",
                "cases_weekly": 2,
                "deaths_weekly": 0
            }),
            json!({
                "countriesAndTerritories": "Czechia",
                "continentExp": "Europe",
                "popData2019": 1000,
                "year_week": "2020-01",
                "cases_weekly": 10,
                "deaths_weekly": 1
            }),
        ];
        let auxiliary = vec![json!({
            "country": "Czechia",
            "indicator": "Daily hospital occupancy",
            "year_week": "2020-W01",
            "value": 4
        })];
        run(&primary, Some(&auxiliary), &PipelineOptions::default()).unwrap()
    }

    #[test]
    fn test_country_file_name() {
        assert_eq!(
            country_file_name("Bonaire, Saint Eustatius and Saba"),
            "Bonaire_Saint_Eustatius_and_Saba"
        );
        assert_eq!(country_file_name("Czechia"), "Czechia");
        assert_eq!(country_file_name("A / B__C"), "A_B_C");
    }

    #[test]
    fn test_render_index() {
        let template = "<script>var max = {}; var lastWeek = ''</script><p>Version 1.0.0</p>";
        let prepared = prepared();
        let page = render_index(template, &prepared.summary, "2020-01", "0.1.0").unwrap();

        assert!(page.contains("lastWeek = '2020-01'"));
        assert!(page.contains("Version 0.1.0"));
        assert!(page.contains(r#""Czechia":{"abs":{"cases":[10.0,10.0],"deaths":[1.0,1.0],"hosp":[4.0,4.0]}"#));
        assert!(page.starts_with("<script>var max = {\"America\""));
    }

    #[test]
    fn test_render_index_without_placeholders() {
        let prepared = prepared();
        let page = render_index("<p>static</p>", &prepared.summary, "2020-01", "0.1.0").unwrap();
        assert_eq!(page, "<p>static</p>");
    }

    #[test]
    fn test_summary_literal_escapes_markup() {
        let mut summary = Summary::new();
        summary.insert("</script>".to_string(), Default::default());
        let literal = summary_literal(&summary).unwrap();

        assert!(!literal.contains('<'));
        let parsed: serde_json::Value = serde_json::from_str(&literal).unwrap();
        assert!(parsed.get("</script>").is_some());
    }

    #[test]
    fn test_write_series() {
        let root = temp_dir("series");
        let written = write_series(&root, &prepared()).unwrap();

        // Two countries with cases and deaths in both units, plus Czechia hosp.
        assert_eq!(written, 10);
        let path = series_path(&root, Unit::Rel, Metric::Hosp, "Europe", "Czechia");
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "week,value\n2020-01,4.0\n");
        assert!(!series_path(&root, Unit::Abs, Metric::Icu, "Europe", "Czechia").exists());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_write_index_and_compressed_copies() {
        let internal = temp_dir("internal");
        let public = temp_dir("public");
        fs::create_dir_all(&internal).unwrap();
        fs::write(internal.join("template.html"), "max = {} lastWeek = ''").unwrap();
        fs::write(internal.join("app.manifest"), "CACHE MANIFEST").unwrap();

        let index = write_index(&internal, &public, &prepared(), "0.1.0").unwrap();
        let page = fs::read_to_string(&index).unwrap();
        assert!(page.ends_with("lastWeek = '2020-01'"));

        let mut unzipped = String::new();
        GzDecoder::new(fs::File::open(public.join("index.html.gz")).unwrap())
            .read_to_string(&mut unzipped)
            .unwrap();
        assert_eq!(unzipped, page);

        let mut unbrotlied = String::new();
        brotli::Decompressor::new(fs::File::open(public.join("index.html.br")).unwrap(), 4096)
            .read_to_string(&mut unbrotlied)
            .unwrap();
        assert_eq!(unbrotlied, page);

        assert_eq!(copy_assets(&internal, &public).unwrap(), 1);
        assert!(public.join("app.manifest").exists());

        fs::remove_dir_all(&internal).unwrap();
        fs::remove_dir_all(&public).unwrap();
    }

    #[test]
    fn test_compress_brotli_shrinks_repetitive_text() {
        let root = temp_dir("brotli");
        fs::create_dir_all(&root).unwrap();
        let path = root.join("page.html");
        let text = "<tr><td>Czechia</td><td>0.123</td></tr>\n".repeat(200);
        fs::write(&path, &text).unwrap();

        let br_path = compress_brotli(&path).unwrap();
        assert_eq!(br_path, root.join("page.html.br"));
        let compressed = fs::read(&br_path).unwrap();
        assert!(compressed.len() < text.len() / 10);

        let mut restored = String::new();
        brotli::Decompressor::new(compressed.as_slice(), 4096)
            .read_to_string(&mut restored)
            .unwrap();
        assert_eq!(restored, text);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_write_json() {
        let dir = temp_dir("json");
        let path = dir.join("prepared.json");
        write_json(&path, &prepared()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["weeks"], json!(["2020-01"]));

        fs::remove_dir_all(&dir).unwrap();
    }
}
