//! Fact probes: small predicates over the filesystem and process table.
//!
//! Nothing is cached. Each call re-executes its command, so a failed probe
//! is simply `false` until the next tick asks again.

use std::path::Path;

use crate::runner::{shell_quote, CommandRunner};

/// True iff `stat` succeeds with output and a silent stderr.
pub async fn path_exists(runner: &dyn CommandRunner, path: &Path) -> bool {
    let path = path.to_string_lossy();
    let response = runner.run("stat", &[path.as_ref()]).await;
    response.is_clean() && !response.output.is_empty()
}

/// True iff some process's command line contains every fragment.
pub async fn process_matches(runner: &dyn CommandRunner, fragments: &[&str]) -> bool {
    first_matching_pid(runner, fragments).await.is_some()
}

/// PID of the first process whose command line contains every fragment.
pub async fn first_matching_pid(runner: &dyn CommandRunner, fragments: &[&str]) -> Option<u32> {
    matching_pids(runner, fragments).await.into_iter().next()
}

/// PIDs of every process whose command line contains every fragment.
pub async fn matching_pids(runner: &dyn CommandRunner, fragments: &[&str]) -> Vec<u32> {
    let lines = process_table(runner).await;
    parse_process_table(&lines, fragments, std::process::id())
}

/// True iff some process running `program` was given `option value`, with
/// the value bare or single-quoted. Longer paths ending in `value` do not
/// count.
pub async fn process_with_option(
    runner: &dyn CommandRunner,
    program: &str,
    option: &str,
    value: &str,
) -> bool {
    let lines = process_table(runner).await;
    !filter_process_table(&lines, std::process::id(), |args| {
        args.contains(program) && has_option(args, option, value)
    })
    .is_empty()
}

async fn process_table(runner: &dyn CommandRunner) -> Vec<String> {
    runner.run("ps", &["-eo", "pid=,args="]).await.output
}

pub(crate) fn parse_process_table(lines: &[String], fragments: &[&str], own_pid: u32) -> Vec<u32> {
    filter_process_table(lines, own_pid, |args| {
        fragments.iter().all(|fragment| args.contains(fragment))
    })
}

/// Filters `pid args...` lines, dropping the probing process itself.
fn filter_process_table(lines: &[String], own_pid: u32, matches: impl Fn(&str) -> bool) -> Vec<u32> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.trim();
            let (pid, args) = line.split_once(char::is_whitespace)?;
            let pid = pid.parse::<u32>().ok()?;
            let args = args.trim();
            if pid == own_pid || args.is_empty() {
                return None;
            }
            matches(args).then_some(pid)
        })
        .collect()
}

/// `option value` appears delimited by whitespace or the ends of `args`.
pub(crate) fn has_option(args: &str, option: &str, value: &str) -> bool {
    let needles = [
        format!("{} {}", option, value),
        format!("{} {}", option, shell_quote(value)),
    ];
    needles.iter().any(|needle| {
        args.match_indices(needle.as_str()).any(|(start, _)| {
            let end = start + needle.len();
            let open = args[..start].chars().next_back().map_or(true, char::is_whitespace);
            let close = args[end..].chars().next().map_or(true, char::is_whitespace);
            open && close
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ShellRunner;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn parse_process_table_requires_every_fragment() {
        let table = lines(&[
            "101 /usr/bin/java -cp bootstrap.jar org.apache.catalina.startup.Bootstrap start",
            "202 mvn clean package -f /repo/app/pom.xml",
            "303 mvn clean package -f /repo/other/pom.xml",
        ]);
        assert_eq!(
            parse_process_table(&table, &["org.apache.catalina.startup.Bootstrap"], 1),
            vec![101]
        );
        assert_eq!(
            parse_process_table(&table, &["mvn", "/repo/app/pom.xml"], 1),
            vec![202]
        );
    }

    #[test]
    fn parse_process_table_skips_self_and_garbage() {
        let table = lines(&["42 tomcat-manager watch Bootstrap", "not-a-pid Bootstrap", ""]);
        assert!(parse_process_table(&table, &["Bootstrap"], 42).is_empty());
    }

    #[test]
    fn has_option_matches_whole_values_only() {
        let args = "mvn -DskipTests clean package -f /repo/app/pom.xml";
        assert!(has_option(args, "-f", "/repo/app/pom.xml"));
        assert!(!has_option(args, "-f", "/repo/app/pom"));
        assert!(!has_option(
            "mvn clean package -f /x/repo/app/pom.xml",
            "-f",
            "/repo/app/pom.xml"
        ));
        assert!(has_option(
            "/bin/bash -l -c mvn clean package -f '/repo/my app/pom.xml' > '/tmp/app.build.log' 2>&1",
            "-f",
            "/repo/my app/pom.xml"
        ));
    }

    #[tokio::test]
    async fn path_exists_reflects_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner::new();
        assert!(path_exists(&runner, dir.path()).await);
        assert!(!path_exists(&runner, &dir.path().join("missing")).await);
    }
}
