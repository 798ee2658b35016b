//! Text body helpers used by the response encoder.

/// The CRLF terminator used on the wire
pub const CRLF: &str = "\r\n";

/// The line that terminates a multi-line text block
pub const TERMINATOR: &str = ".";

/// Removes every CR and LF character so a value cannot split a response line.
pub fn sanitize(input: &str) -> String {
    input.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Normalizes all line endings to CRLF. Existing CRLF pairs are left intact.
pub fn lf_to_crlf(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\n', CRLF)
}

/// Escapes every body line consisting solely of `.` so it is not read as the
/// block terminator. Expects CRLF line endings.
pub fn dot_stuff(body: &str) -> String {
    body.split(CRLF)
        .map(|line| if line == TERMINATOR { ".." } else { line })
        .collect::<Vec<_>>()
        .join(CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("250 ok\r\n999 injected"), "250 ok999 injected");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_lf_to_crlf() {
        assert_eq!(lf_to_crlf("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(lf_to_crlf("no newline"), "no newline");
    }

    #[test]
    fn test_dot_stuff_only_lone_dots() {
        assert_eq!(dot_stuff("a\r\n.\r\nb"), "a\r\n..\r\nb");
        assert_eq!(dot_stuff(".leading\r\n. "), ".leading\r\n. ");
        assert_eq!(dot_stuff("."), "..");
    }
}
