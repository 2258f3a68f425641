//! Topics command: print the subscribed topic map without connecting.

use tabled::{Table, Tabled, settings::Style};

use plantwatch_core::{TopicMap, TopicTarget};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Tabled, serde::Serialize)]
struct TopicRow {
    #[tabled(rename = "Topic")]
    topic: String,
    #[tabled(rename = "Feeds")]
    feeds: &'static str,
}

fn target_name(target: TopicTarget) -> &'static str {
    match target {
        TopicTarget::Metric(metric) => metric.label(),
        TopicTarget::Classification => "Classification",
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = plantwatch_config::load_config_or_default();
    let map = TopicMap::new(&cfg.topics);

    let rows: Vec<TopicRow> = map
        .iter()
        .map(|(topic, target)| TopicRow {
            topic: topic.to_owned(),
            feeds: target_name(target),
        })
        .collect();

    let out = match global.output {
        OutputFormat::Table => Table::new(&rows).with(Style::rounded()).to_string(),
        OutputFormat::Json => output::render_json_pretty(&rows),
        OutputFormat::JsonCompact => output::render_json_compact(&rows),
        OutputFormat::Plain => rows
            .iter()
            .map(|r| r.topic.clone())
            .collect::<Vec<_>>()
            .join("\n"),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
