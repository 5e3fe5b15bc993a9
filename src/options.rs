//! 命令行选项解析。
//! `--net {file}` 或 `-n` 为必需参数，其余选项覆盖配置文件中的值。

use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Dot,
    Stats,
}

fn make_options_parser() -> clap::Command {
    Command::new("pn-cover")
        .no_binary_name(true)
        .args_override_self(true)
        .version("v0.1.0")
        .about("Karp-Miller coverability tree for place/transition nets")
        .arg(
            Arg::new("net")
                .short('n')
                .long("net")
                .value_name("FILE")
                .help("Net definition (.json or .ron)")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Analysis configuration")
                .default_value(crate::config::DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::new("node-limit")
                .short('l')
                .long("node-limit")
                .value_name("N")
                .help("Maximum number of tree nodes, 0 for unlimited")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Output format")
                .default_value("text")
                .value_parser(["text", "dot", "stats"]),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the result to FILE instead of stdout"),
        )
        .arg(
            Arg::new("net-dot")
                .long("net-dot")
                .value_name("FILE")
                .help("Also dump the net itself as DOT"),
        )
        .arg(
            Arg::new("no-tags")
                .long("no-tags")
                .action(ArgAction::SetTrue)
                .help("Hide node tags in text and DOT output"),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub net: PathBuf,
    pub config: PathBuf,
    /// `Some(None)` 表示命令行显式取消上限
    pub node_limit: Option<Option<usize>>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub net_dot: Option<PathBuf>,
    pub hide_tags: bool,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("text") => OutputFormat::Text,
            Some("dot") => OutputFormat::Dot,
            Some("stats") => OutputFormat::Stats,
            _ => return Err("UnsupportedOutputFormat")?,
        };

        let net = matches
            .get_one::<String>("net")
            .map(PathBuf::from)
            .ok_or("MissingNet")?;
        let config = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .ok_or("MissingConfig")?;
        let node_limit = matches
            .get_one::<usize>("node-limit")
            .map(|limit| if *limit == 0 { None } else { Some(*limit) });

        Ok(Options {
            net,
            config,
            node_limit,
            format,
            output: matches.get_one::<String>("output").map(PathBuf::from),
            net_dot: matches.get_one::<String>("net-dot").map(PathBuf::from),
            hide_tags: matches.get_flag("no-tags"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let options = Options::parse_from_str("-n demos/producer.json").unwrap();
        assert_eq!(options.net, PathBuf::from("demos/producer.json"));
        assert_eq!(options.config, PathBuf::from("pn-cover.toml"));
        assert_eq!(options.format, OutputFormat::Text);
        assert_eq!(options.node_limit, None);
        assert!(options.output.is_none());
        assert!(!options.hide_tags);
    }

    #[test]
    fn test_parse_overrides() {
        let options = Options::parse_from_str(
            "--net 'my nets/a.ron' -f dot -l 0 -o tree.dot --net-dot net.dot --no-tags",
        )
        .unwrap();
        assert_eq!(options.net, PathBuf::from("my nets/a.ron"));
        assert_eq!(options.format, OutputFormat::Dot);
        assert_eq!(options.node_limit, Some(None));
        assert_eq!(options.output, Some(PathBuf::from("tree.dot")));
        assert_eq!(options.net_dot, Some(PathBuf::from("net.dot")));
        assert!(options.hide_tags);

        let limited = Options::parse_from_str("-n a.json -l 25").unwrap();
        assert_eq!(limited.node_limit, Some(Some(25)));

        // PN_COVER_FLAGS come first, so later flags win
        let repeated = Options::parse_from_str("-f stats -n a.json -f text").unwrap();
        assert_eq!(repeated.format, OutputFormat::Text);
    }

    #[test]
    fn test_parse_from_str_err() {
        assert!(Options::parse_from_str("-n a.json -f svg").is_err());
        assert!(Options::parse_from_str("-f text").is_err());
    }

    #[test]
    fn test_parse_from_args_err() {
        let options = Options::parse_from_args(&[
            "-n".to_owned(),
            "a.json".to_owned(),
            "-l".to_owned(),
            "many".to_owned(),
        ]);
        assert!(options.is_err());
    }
}
