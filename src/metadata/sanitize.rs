//! Filesystem-safe filename substitution.

/// Character substitutions applied to every resolved metadata string.
/// Unsafe characters map to visually close full-width or bracket
/// equivalents; the mapping is forward-only.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('（', "("),
    ('）', ")"),
    ('<', "《"),
    ('>', "》"),
    ('\\', "#"),
    ('"', "'"),
    ('/', "#"),
    ('|', "_"),
    ('?', "？"),
    ('*', "-"),
    ('【', "["),
    ('】', "]"),
    (':', "："),
];

/// Sanitize a metadata string for use in a path component.
///
/// Whitespace is dropped entirely; the client pads titles with
/// decorative spaces that would otherwise produce awkward filenames.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    'chars: for c in name.chars() {
        if c.is_whitespace() {
            continue;
        }
        for (from, to) in SUBSTITUTIONS {
            if c == *from {
                out.push_str(to);
                continue 'chars;
            }
        }
        out.push(c);
    }
    out
}
