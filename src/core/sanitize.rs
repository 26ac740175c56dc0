//! Purpose: Rewrite machine-specific text out of a finished transcript.
//! Exports: `Substitution`, `SubstitutionTable`.
//! Role: Last pass before persistence; turns absolute paths into portable names.
//! Invariants: Rules apply in declared order, each as a global literal replace.
//! Invariants: Reordering rules changes output; keep specific rules ahead of general ones.
//! Invariants: Rules with an empty source are ignored.
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstitutionTable {
    rules: Vec<Substitution>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard table for a transcript of `target`.
    ///
    /// 1. the full invocation prefix becomes `alias`,
    /// 2. any remaining absolute target path becomes its file name,
    /// 3. the working directory prefix (with its trailing separator) is stripped.
    pub fn for_target(invocation: &str, alias: &str, target: &Path, workdir: &Path) -> Self {
        let target_path = target.to_string_lossy().to_string();
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| target_path.clone());
        let mut workdir_prefix = workdir.to_string_lossy().to_string();
        if !workdir_prefix.ends_with(std::path::MAIN_SEPARATOR) {
            workdir_prefix.push(std::path::MAIN_SEPARATOR);
        }

        Self::new()
            .with_rule(invocation, alias)
            .with_rule(target_path, file_name)
            .with_rule(workdir_prefix, "")
    }

    pub fn with_rule(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.push(from, to);
        self
    }

    pub fn push(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.rules.push(Substitution {
            from: from.into(),
            to: to.into(),
        });
    }

    pub fn rules(&self) -> &[Substitution] {
        &self.rules
    }

    pub fn apply(&self, doc: &str) -> String {
        self.rules
            .iter()
            .filter(|rule| !rule.from.is_empty())
            .fold(doc.to_string(), |text, rule| {
                if text.contains(rule.from.as_str()) {
                    text.replace(rule.from.as_str(), &rule.to)
                } else {
                    text
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::SubstitutionTable;

    #[test]
    fn specific_rule_first_wins() {
        let table = SubstitutionTable::new()
            .with_rule("run /a/b/tool", "tool")
            .with_rule("/a/b/tool", "toolfile");
        assert_eq!(table.apply("run /a/b/tool now"), "tool now");
    }

    #[test]
    fn reversed_order_gives_a_different_result() {
        let table = SubstitutionTable::new()
            .with_rule("/a/b/tool", "toolfile")
            .with_rule("run /a/b/tool", "tool");
        assert_eq!(table.apply("run /a/b/tool now"), "run toolfile now");
    }

    #[test]
    fn replaces_every_occurrence() {
        let table = SubstitutionTable::new().with_rule("/tmp/w/", "");
        assert_eq!(
            table.apply("/tmp/w/a and /tmp/w/b and /tmp/w/c"),
            "a and b and c"
        );
    }

    #[test]
    fn literal_not_regex() {
        let table = SubstitutionTable::new().with_rule("a.c", "X");
        assert_eq!(table.apply("abc a.c"), "abc X");
    }

    #[test]
    fn empty_source_is_ignored() {
        let table = SubstitutionTable::new().with_rule("", "X");
        assert_eq!(table.apply("abc"), "abc");
    }

    #[cfg(unix)]
    #[test]
    fn target_table_has_three_ordered_rules() {
        let table = SubstitutionTable::for_target(
            "java -jar /opt/build/bunkr-cli-0.9.jar",
            "bunkr",
            Path::new("/opt/build/bunkr-cli-0.9.jar"),
            Path::new("/tmp/tmp.Xy12"),
        );
        let doc = "```shell\njava -jar /opt/build/bunkr-cli-0.9.jar /tmp/tmp.Xy12/demo.bunkr ls /\n```\n\
                   Generated using build `/opt/build/bunkr-cli-0.9.jar 0.9`.\n\
                   /tmp/tmp.Xy12/file1.txt\n";
        assert_eq!(
            table.apply(doc),
            "```shell\nbunkr demo.bunkr ls /\n```\n\
             Generated using build `bunkr-cli-0.9.jar 0.9`.\n\
             file1.txt\n"
        );
        assert_eq!(table.rules().len(), 3);
        assert_eq!(table.rules()[2].from, "/tmp/tmp.Xy12/");
    }

    #[cfg(unix)]
    #[test]
    fn workdir_with_trailing_separator_is_not_doubled() {
        let table = SubstitutionTable::for_target("x", "x", Path::new("/t"), Path::new("/w/"));
        assert_eq!(table.rules()[2].from, "/w/");
    }

    #[test]
    fn application_is_pure() {
        let table = SubstitutionTable::new().with_rule("a", "b");
        let input = "aaa";
        assert_eq!(table.apply(input), table.apply(input));
        assert_eq!(input, "aaa");
    }
}
