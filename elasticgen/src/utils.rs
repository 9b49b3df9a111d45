//! Utilities.

/// Indents every line in the string.
pub fn indent(str: String, indent: usize) -> String {
    str.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("{}{}", " ".repeat(indent), l) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reserved words of Verilog-2001.
pub const VERILOG_KEYWORDS: [&str; 123] = [
    "always", "and", "assign", "automatic", "begin", "buf", "bufif0", "bufif1", "case", "casex", "casez", "cell",
    "cmos", "config", "deassign", "default", "defparam", "design", "disable", "edge", "else", "end", "endcase",
    "endconfig", "endfunction", "endgenerate", "endmodule", "endprimitive", "endspecify", "endtable", "endtask",
    "event", "for", "force", "forever", "fork", "function", "generate", "genvar", "highz0", "highz1", "if", "ifnone",
    "incdir", "include", "initial", "inout", "input", "instance", "integer", "join", "large", "liblist", "library",
    "localparam", "macromodule", "medium", "module", "nand", "negedge", "nmos", "nor", "noshowcancelled", "not",
    "notif0", "notif1", "or", "output", "parameter", "pmos", "posedge", "primitive", "pull0", "pull1", "pulldown",
    "pullup", "pulsestyle_ondetect", "pulsestyle_onevent", "rcmos", "real", "realtime", "reg", "release", "repeat",
    "rnmos", "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "showcancelled", "signed", "small", "specify",
    "specparam", "strong0", "strong1", "supply0", "supply1", "table", "task", "time", "tran", "tranif0", "tranif1",
    "tri", "tri0", "tri1", "triand", "trior", "trireg", "unsigned", "use", "vectored", "wait", "wand", "weak0",
    "weak1", "while", "wire", "wor", "xnor", "xor",
];

/// Returns `true` if `name` can be used as a Verilog identifier: a simple identifier that is not a
/// reserved word.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let simple = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    };
    simple && !VERILOG_KEYWORDS.contains(&name)
}

/// Some or executing the given expression.
#[macro_export]
macro_rules! some_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Some(r) => r,
            None => $err,
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("merge_0"));
        assert!(is_identifier("_tag"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("0tag"));
        assert!(!is_identifier("spec-tag"));
    }

    #[test]
    fn reserved_words_are_not_identifiers() {
        for keyword in ["module", "wire", "reg", "input", "output", "assign", "join", "endmodule"] {
            assert!(!is_identifier(keyword), "{}", keyword);
        }
        assert!(is_identifier("wire0"));
        assert!(is_identifier("Module"));
        assert!(VERILOG_KEYWORDS.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn indent_keeps_blank_lines_empty() {
        assert_eq!(indent("a\n\nb".to_string(), 2), "  a\n\n  b");
    }
}
