//! The two interchangeable pattern engines
//!
//! `Linear` wraps the `regex` crate: matching cost is bounded by input
//! length x pattern size, so adversarial banners cannot trigger
//! catastrophic backtracking. It rejects backreferences at compile time.
//! `Backtracking` wraps `fancy-regex` for full expressiveness when the
//! probe set needs it and the input is trusted.
//!
//! Callers see engine-agnostic capture semantics: index 0 is the full
//! match, 1..N are the numbered groups, `None` for groups that did not
//! participate.

use flowprint_common::MatchEngine;

/// Pattern flags taken from the probe file (`i`, `s` after the closing
/// delimiter, as in nmap-service-probes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    pub case_insensitive: bool,
    pub dot_matches_newline: bool,
}

impl PatternFlags {
    fn inline_prefix(self) -> &'static str {
        match (self.case_insensitive, self.dot_matches_newline) {
            (true, true) => "(?is)",
            (true, false) => "(?i)",
            (false, true) => "(?s)",
            (false, false) => "",
        }
    }
}

/// A probe pattern compiled for one of the two engines.
#[derive(Debug)]
pub enum CompiledPattern {
    Linear(regex::Regex),
    Backtracking(fancy_regex::Regex),
}

impl CompiledPattern {
    /// Compile `pattern` for the selected engine. The error string carries
    /// the engine's own diagnostics; the caller wraps it with the probe
    /// file line number.
    pub fn compile(
        pattern: &str,
        flags: PatternFlags,
        engine: MatchEngine,
    ) -> Result<Self, String> {
        let source = format!("{}{}", flags.inline_prefix(), pattern);
        match engine {
            MatchEngine::Linear => regex::Regex::new(&source)
                .map(CompiledPattern::Linear)
                .map_err(|e| e.to_string()),
            MatchEngine::Backtracking => fancy_regex::Regex::new(&source)
                .map(CompiledPattern::Backtracking)
                .map_err(|e| e.to_string()),
        }
    }

    /// Run the pattern over `input`, returning capture groups on a match.
    ///
    /// Index 0 is the full match; a group that did not participate is
    /// `None`. A backtracking runtime fault (e.g. the engine's internal
    /// backtrack limit) is reported as "no match" rather than an error:
    /// per-banner matching is infallible by contract.
    pub fn captures(&self, input: &str) -> Option<Vec<Option<String>>> {
        match self {
            CompiledPattern::Linear(re) => re.captures(input).map(|caps| {
                (0..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                    .collect()
            }),
            CompiledPattern::Backtracking(re) => {
                re.captures(input).ok().flatten().map(|caps| {
                    (0..caps.len())
                        .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                        .collect()
                })
            }
        }
    }

    /// True when the pattern matches at all.
    pub fn is_match(&self, input: &str) -> bool {
        match self {
            CompiledPattern::Linear(re) => re.is_match(input),
            CompiledPattern::Backtracking(re) => re.is_match(input).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_both(pattern: &str) -> (CompiledPattern, CompiledPattern) {
        let flags = PatternFlags::default();
        (
            CompiledPattern::compile(pattern, flags, MatchEngine::Linear).unwrap(),
            CompiledPattern::compile(pattern, flags, MatchEngine::Backtracking).unwrap(),
        )
    }

    #[test]
    fn engines_agree_on_safe_patterns() {
        let inputs = [
            "SSH-2.0-OpenSSH_8.9\r\n",
            "HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n",
            "220 mail.example.org ESMTP Postfix",
            "\x00\x01random binary\x7f",
            "",
        ];
        let patterns = [
            r"^SSH-([\d.]+)-(\S+)",
            r"Server: nginx/([\w.]+)",
            r"^220 ([-\w.]+) ESMTP",
            r"^\+OK",
        ];

        for pattern in patterns {
            let (linear, backtracking) = compile_both(pattern);
            for input in inputs {
                assert_eq!(
                    linear.captures(input),
                    backtracking.captures(input),
                    "engines disagree for {pattern:?} on {input:?}"
                );
            }
        }
    }

    #[test]
    fn linear_rejects_backreferences() {
        let flags = PatternFlags::default();
        assert!(CompiledPattern::compile(r"(\w+) \1", flags, MatchEngine::Linear).is_err());
        // same pattern is fine on the backtracking engine
        let bt = CompiledPattern::compile(r"(\w+) \1", flags, MatchEngine::Backtracking).unwrap();
        assert!(bt.is_match("echo echo"));
    }

    #[test]
    fn case_insensitive_flag() {
        let flags = PatternFlags {
            case_insensitive: true,
            ..Default::default()
        };
        let p = CompiledPattern::compile(r"^220.*ftp", flags, MatchEngine::Linear).unwrap();
        assert!(p.is_match("220 Welcome to My FTP Server"));
    }

    #[test]
    fn dot_matches_newline_flag() {
        let flags = PatternFlags {
            dot_matches_newline: true,
            ..Default::default()
        };
        let p = CompiledPattern::compile(r"^HTTP.*nginx", flags, MatchEngine::Linear).unwrap();
        assert!(p.is_match("HTTP/1.1 200 OK\r\nServer: nginx\r\n"));
    }

    #[test]
    fn non_participating_group_is_none() {
        let (linear, backtracking) = compile_both(r"^a(b)?(c)");
        let caps = linear.captures("ac").unwrap();
        assert_eq!(caps[1], None);
        assert_eq!(caps[2], Some("c".to_string()));
        assert_eq!(backtracking.captures("ac").unwrap(), caps);
    }

    #[test]
    fn malformed_pattern_fails_compile() {
        let flags = PatternFlags::default();
        assert!(CompiledPattern::compile(r"([unclosed", flags, MatchEngine::Linear).is_err());
        assert!(
            CompiledPattern::compile(r"([unclosed", flags, MatchEngine::Backtracking).is_err()
        );
    }
}
