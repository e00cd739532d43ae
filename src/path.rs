/// Remove `prefix` from the start of `path`.
///
/// The prefix is only removed on an exact match of its full length. If
/// `prefix` is longer than `path`, does not match, or would split a UTF-8
/// character, `path` is returned unchanged.
///
/// **Parameters**
/// - `path`: the string to trim.
/// - `prefix`: the leading substring to remove, usually the application
///   base path.
/// - `case_insensitive`: compare ASCII letters without regard to case.
pub fn trim_prefix<'a>(path: &'a str, prefix: &str, case_insensitive: bool) -> &'a str {
    if path.len() < prefix.len() {
        return path;
    }

    let (head, rest) = match (path.get(..prefix.len()), path.get(prefix.len()..)) {
        (Some(head), Some(rest)) => (head, rest),
        _ => return path,
    };

    let matches = if case_insensitive {
        head.eq_ignore_ascii_case(prefix)
    } else {
        head == prefix
    };

    if matches {
        rest
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::trim_prefix;

    #[test]
    fn trims_matching_prefix() {
        assert_eq!(trim_prefix("/srv/app/src/main.rs", "/srv/app", false), "/src/main.rs");
    }

    #[test]
    fn leaves_non_matching_path_alone() {
        assert_eq!(trim_prefix("/vendor/pkg/a/f1.php", "/app", false), "/vendor/pkg/a/f1.php");
    }

    #[test]
    fn prefix_longer_than_path() {
        assert_eq!(trim_prefix("/a", "/a/b/c", false), "/a");
    }

    #[test]
    fn empty_prefix_is_noop() {
        assert_eq!(trim_prefix("/x.php", "", false), "/x.php");
    }

    #[test]
    fn second_trim_is_noop() {
        let once = trim_prefix("/app/x.php", "/app", false);
        assert_eq!(trim_prefix(once, "/app", false), once);
    }

    #[test]
    fn case_sensitive_by_default() {
        assert_eq!(trim_prefix("/APP/x.php", "/app", false), "/APP/x.php");
        assert_eq!(trim_prefix("/APP/x.php", "/app", true), "/x.php");
    }

    #[test]
    fn does_not_split_multibyte_chars() {
        // A two-byte cut of "aé" lands inside "é".
        assert_eq!(trim_prefix("aé/x", "ab", false), "aé/x");
        assert_eq!(trim_prefix("/é/x", "/é", false), "/x");
    }
}
