//! The doctype shorthand table. `doctype xml` additionally flips the
//! generator into XML mode; that effect lives in the generator, this module
//! only maps shorthands to literal declaration lines.

/// Shorthand → literal doctype string. Unknown shorthands fall back to
/// `<!DOCTYPE {verbatim}>` via [`doctype_line`].
pub fn lookup(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "html" | "5" => "<!DOCTYPE html>",
        "xml" => "<?xml version=\"1.0\" encoding=\"utf-8\" ?>",
        "transitional" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">"
        }
        "strict" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">"
        }
        "frameset" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd\">"
        }
        "1.1" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">"
        }
        "basic" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML Basic 1.1//EN\" \"http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd\">"
        }
        "mobile" => {
            "<!DOCTYPE html PUBLIC \"-//WAPFORUM//DTD XHTML Mobile 1.2//EN\" \"http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd\">"
        }
        "plist" => {
            "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">"
        }
        "svg1.1" => {
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">"
        }
        "smil1" => {
            "<!DOCTYPE smil PUBLIC \"-//W3C//DTD SMIL 1.0//EN\" \"http://www.w3.org/TR/REC-smil/SMIL10.dtd\">"
        }
        "smil2" => {
            "<!DOCTYPE smil PUBLIC \"-//W3C//DTD SMIL 2.0//EN\" \"http://www.w3.org/2001/SMIL20/SMIL20.dtd\">"
        }
        _ => return None,
    })
}

/// The declaration line for a `doctype <kind>` directive.
pub fn doctype_line(kind: &str) -> String {
    match lookup(kind) {
        Some(literal) => literal.to_string(),
        None => format!("<!DOCTYPE {kind}>"),
    }
}
