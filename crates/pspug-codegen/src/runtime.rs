//! The PowerShell runtime embedded in every artifact, and the assembler
//! that wraps the generated body in it.
//!
//! The artifact is a single script taking one `$data` argument. The
//! preamble declares the trace variables and the attribute helpers; the
//! body appends rendered lines to a shared `List[string]`; the epilogue
//! joins the lines and translates any runtime failure into an exception
//! tagged with the last traced template coordinate.

use pspug_parser::Options;

/// Runtime helper functions. Mixin bodies run in child scopes but mutate
/// the same `$o` list through PowerShell's parent-scope variable lookup;
/// only the trace variables need the explicit `script:` qualifier so the
/// catch block reads current values.
pub const RUNTIME: &str = r#"param($data)

$script:src_path = ''
$script:src_line = 0

function out_enc($v) {
    $s = "$v"
    $s.Replace('&', '&amp;').Replace('<', '&lt;').Replace('>', '&gt;').Replace('"', '&quot;')
}

function add_class($parts, $v) {
    if ($null -eq $v -or $v -is [bool]) { return }
    if ($v -is [string]) {
        foreach ($w in $v.Split(' ')) {
            if ($w -ne '' -and -not $parts.Contains($w)) { $parts.Add($w) }
        }
    } elseif ($v -is [System.Collections.IDictionary]) {
        foreach ($k in $v.Keys) {
            if ($v[$k] -and -not $parts.Contains("$k")) { $parts.Add("$k") }
        }
    } elseif ($v -is [System.Collections.IEnumerable]) {
        foreach ($item in $v) { add_class $parts $item }
    } else {
        $s = "$v"
        if ($s -ne '' -and -not $parts.Contains($s)) { $parts.Add($s) }
    }
}

function out_class($v) {
    $parts = [System.Collections.Generic.List[string]]::new()
    add_class $parts $v
    $parts -join ' '
}

function to_kebab($s) {
    ("$s" -creplace '(?<=.)([A-Z])', '-$1').ToLower()
}

function out_style($v) {
    if ($v -is [System.Collections.IDictionary]) {
        $pairs = foreach ($k in $v.Keys) { (to_kebab $k) + ': ' + $v[$k] }
        $pairs -join '; '
    } else {
        "$v"
    }
}

function out_attr($key, $value, $escape) {
    if ($null -eq $value) { return '' }
    if ($value -is [bool]) {
        if (-not $value) { return '' }
        if ($pug_props) { return ' ' + $key }
        return ' ' + $key + '="' + $key + '"'
    }
    $s = switch ($key) {
        'class' { out_class $value }
        'style' { out_style $value }
        default { "$value" }
    }
    if ($key -eq 'class' -and $s -eq '') { return '' }
    if ($escape) { $s = out_enc $s }
    ' ' + $key + '="' + $s + '"'
}

function out_merged_attrs($attrs, $extra) {
    $merged = [ordered]@{}
    foreach ($k in $attrs.Keys) { $merged[$k] = $attrs[$k] }
    if ($extra -is [System.Collections.IDictionary]) {
        foreach ($k in $extra.Keys) {
            if ("$k" -eq 'class' -and $merged.Contains('class')) {
                $merged['class'] = @($merged['class'], $extra[$k])
            } elseif ("$k" -eq 'style' -and $merged.Contains('style')) {
                $merged['style'] = (out_style $merged['style']) + '; ' + (out_style $extra[$k])
            } else {
                $merged["$k"] = $extra[$k]
            }
        }
    }
    $out = ''
    foreach ($k in $merged.Keys) { $out += out_attr "$k" $merged[$k] $true }
    $out
}
"#;

/// Wrap a generated body in the full artifact: preamble, accumulator,
/// `try` with the body, and the error-tagging epilogue.
pub fn assemble(body: &[String], options: &Options) -> String {
    let mut script = String::with_capacity(RUNTIME.len() + body.len() * 48 + 512);
    script.push_str(RUNTIME);
    script.push('\n');
    script.push_str(&format!(
        "$pug_props = ${}\n",
        if options.properties { "true" } else { "false" }
    ));
    script.push_str("$o = [System.Collections.Generic.List[string]]::new()\n");
    script.push_str("try {\n");
    for line in body {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str("$o -join \"`n\"\n");
    script.push_str("} catch {\n");
    script.push_str(
        "$_.Exception | Add-Member -NotePropertyName PugLine -NotePropertyValue $script:src_line -Force\n",
    );
    script.push_str(
        "$_.Exception | Add-Member -NotePropertyName PugPath -NotePropertyValue $script:src_path -Force\n",
    );
    script.push_str("throw\n");
    script.push_str("}\n");
    script
}
