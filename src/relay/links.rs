use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref CLOSING_REFERENCE: Regex = Regex::new(
        r"(?i)\b(?P<keyword>close|closes|closed|fix|fixes|fixed|resolve|resolves|resolved) #(?P<number>\d+)"
    )
    .expect("closing reference regex is valid");
}

/// Rewrites every issue reference that follows a closing keyword (`fixes #12`) into a markdown
/// link pointing to the issue tracker of `repo_url`.
///
/// References that aren't attached to a keyword are left untouched, so rewriting an already
/// rewritten body is a no-op.
pub fn rewrite_issue_links(body: &str, repo_url: &str) -> String {
    let repo_url = repo_url.trim_end_matches('/');

    CLOSING_REFERENCE
        .replace_all(body, |caps: &Captures| {
            let number = &caps["number"];
            format!(
                "{} [#{}]({}/issues/{})",
                &caps["keyword"], number, repo_url, number
            )
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "https://github.com/gotify/server";

    #[test]
    fn single_issue_linked() {
        let body = "Fixes #237\r\nTested http and https unix sockets both work\r\nnginx work fine with both PR since";

        assert_eq!(
            rewrite_issue_links(body, REPO),
            "Fixes [#237](https://github.com/gotify/server/issues/237)\r\nTested http and https unix sockets both work\r\nnginx work fine with both PR since"
        );
    }

    #[test]
    fn no_issue_linked() {
        let body = "Go embed has been out for a while now and packr recommends moving to //go:embed as well, this PR removes packr from the dependency list and uses go:embed to embed swagger and UI files.";

        assert_eq!(rewrite_issue_links(body, REPO), body);
    }

    #[test]
    fn multiple_issues_linked() {
        let body = "notifs pushes normally to android\r\ncloses #1337\r\nnotifs pushes normally to ios\r\ncloses #127";

        assert_eq!(
            rewrite_issue_links(body, REPO),
            "notifs pushes normally to android\r\ncloses [#1337](https://github.com/gotify/server/issues/1337)\r\nnotifs pushes normally to ios\r\ncloses [#127](https://github.com/gotify/server/issues/127)"
        );
    }

    #[test]
    fn bare_references_are_kept() {
        let body = "see #12, related to #4 and PR#9";

        assert_eq!(rewrite_issue_links(body, REPO), body);
    }

    #[test]
    fn only_keyword_reference_is_rewritten() {
        let body = "resolves #5, follow-up of #5";

        assert_eq!(
            rewrite_issue_links(body, REPO),
            "resolves [#5](https://github.com/gotify/server/issues/5), follow-up of #5"
        );
    }

    #[test]
    fn same_issue_under_two_keywords_is_not_nested() {
        let body = "Fixes #42\nCloses #42";

        let rewritten = rewrite_issue_links(body, REPO);

        assert_eq!(
            rewritten,
            "Fixes [#42](https://github.com/gotify/server/issues/42)\nCloses [#42](https://github.com/gotify/server/issues/42)"
        );
        assert!(!rewritten.contains("[[#42]"));
        assert!(!rewritten.contains("[#42]([#42]"));
    }

    #[test]
    fn prefix_numbers_are_independent() {
        let body = "fix #12 and fixed #123";

        assert_eq!(
            rewrite_issue_links(body, REPO),
            "fix [#12](https://github.com/gotify/server/issues/12) and fixed [#123](https://github.com/gotify/server/issues/123)"
        );
    }

    #[test]
    fn keywords_are_case_insensitive_and_word_bound() {
        assert_eq!(
            rewrite_issue_links("RESOLVED #7", REPO),
            "RESOLVED [#7](https://github.com/gotify/server/issues/7)"
        );
        assert_eq!(rewrite_issue_links("prefix #7", REPO), "prefix #7");
        assert_eq!(rewrite_issue_links("fixes #", REPO), "fixes #");
        assert_eq!(rewrite_issue_links("fixes  #7", REPO), "fixes  #7");
    }

    #[test]
    fn rewriting_twice_is_a_noop() {
        let once = rewrite_issue_links("closes #1", REPO);

        assert_eq!(rewrite_issue_links(&once, REPO), once);
    }

    #[test]
    fn trailing_slash_in_repo_url_is_ignored() {
        assert_eq!(
            rewrite_issue_links("fixes #3", "https://github.com/prologin/site/"),
            "fixes [#3](https://github.com/prologin/site/issues/3)"
        );
    }
}
