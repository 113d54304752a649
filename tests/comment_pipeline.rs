//! End-to-end scenarios over real source text: parse, pre-pass, semantic
//! rewrite, post-pass repair, print.

use trivia::pipeline::{Pipeline, PipelineError, transform_source_file};
use trivia::parser::ParserState;
use trivia::session::SessionError;

fn transform(source: &str) -> String {
    transform_source_file("test.ts", source).expect("transform failed")
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// =============================================================================
// Attachment
// =============================================================================

#[test]
fn every_comment_appears_exactly_once() {
    let out = transform(
        "// a\nvar x = 1; // b\n/* c */ f(x);\n// d\n\n// e\n",
    );
    for marker in ["// a", "// b", "/* c */", "// d", "// e"] {
        assert_eq!(count_occurrences(&out, marker), 1, "{marker} in {out:?}");
    }
}

#[test]
fn leading_comment_stays_with_its_statement() {
    let out = transform("// doc\nf();\n");
    assert_eq!(out, "// doc\nf();\n");
}

#[test]
fn same_line_trailing_comment_stays_on_the_line() {
    let out = transform("var a = 1; // tail\nvar b = 2;\n");
    assert_eq!(out, "var a = 1; // tail\nvar b = 2;\n");
}

#[test]
fn triple_slash_comments_are_discarded() {
    let out = transform("/// <reference path=\"x\" />\nf();\n");
    assert_eq!(out, "f();\n");
}

// =============================================================================
// Detachment
// =============================================================================

#[test]
fn detached_header_stays_at_the_top() {
    let out = transform("// header\n\nf();\n");
    assert_eq!(out, "// header\nf();\n");
}

#[test]
fn detached_footer_stays_at_the_bottom() {
    let out = transform("f();\n\n// footer\n");
    assert_eq!(out, "f();\n// footer\n");
}

#[test]
fn footer_on_the_next_line_joins_the_last_statement() {
    let out = transform("f(); // same\n// next\n");
    assert_eq!(out, "f(); // same // next\n");
}

#[test]
fn comment_only_file_survives() {
    let out = transform("// only a comment\n");
    assert_eq!(out, "// only a comment\n");
}

#[test]
fn comment_only_file_keeps_every_group() {
    // Blank lines split the comments into groups; with no statement to
    // anchor on, every group still reaches the output.
    let out = transform("// a\n\n// b\n");
    assert_eq!(out, "// a\n// b\n");
}

#[test]
fn header_split_by_blank_line_divides_ownership() {
    // The first comment is a file header; the second documents the
    // statement and follows it through the rewrite.
    let out = transform("// header\n\n// doc\nexport var x = 1;\n");
    assert_eq!(out, "// header\n// doc\nexports.x = 1;\n");
}

// =============================================================================
// Repair after lowering
// =============================================================================

#[test]
fn field_initializer_comment_moves_to_the_assignment() {
    let out = transform("class C {\n    // note\n    x = 1;\n}\n");
    assert_eq!(out, "class C {\n}\n// note\nC.prototype.x = 1;\n");
}

#[test]
fn static_field_comment_moves_to_the_assignment() {
    let out = transform("class C {\n    // s\n    static y = 2;\n}\n");
    assert_eq!(out, "class C {\n}\n// s\nC.y = 2;\n");
}

#[test]
fn uninitialized_member_keeps_its_comment_in_place() {
    let out = transform("class C {\n    // kept\n    x;\n    static y = 2;\n}\n");
    assert_eq!(out, "class C {\n    // kept\n    x;\n}\nC.y = 2;\n");
}

#[test]
fn exported_variable_comment_moves_to_exports_assignment() {
    let out = transform("// doc\nexport var x = 1;\n");
    assert_eq!(out, "// doc\nexports.x = 1;\n");
}

#[test]
fn each_declarator_lowers_but_the_group_comment_lands_once() {
    let out = transform("// group\nexport var a = 1, b = 2;\n");
    assert_eq!(out, "// group\nexports.a = 1;\nexports.b = 2;\n");
}

#[test]
fn import_comment_moves_to_require_without_duplication() {
    let out = transform("// keep\nimport {a} from \"m\";\n");
    assert_eq!(out, "// keep\nvar m_1 = require(\"m\");\n");
    assert_eq!(count_occurrences(&out, "// keep"), 1);
}

#[test]
fn side_effect_import_keeps_its_comment() {
    let out = transform("// polyfill\nimport \"p\";\n");
    assert_eq!(out, "// polyfill\nrequire(\"p\");\n");
}

#[test]
fn reexport_comment_moves_to_require() {
    let out = transform("// re\nexport {a} from \"dep\";\n");
    assert_eq!(out, "// re\nvar dep_1 = require(\"dep\");\n");
}

// =============================================================================
// The license-header scenario
// =============================================================================

#[test]
fn license_header_survives_a_full_rewrite() {
    let source = "/* @license MIT */\n\n// keep\nimport {a} from \"m\";\n\nexport var x = 1;\n";
    let out = transform(source);
    assert_eq!(
        out,
        "/* @license MIT */\n// keep\nvar m_1 = require(\"m\");\nexports.x = 1;\n"
    );
}

#[test]
fn license_header_is_not_claimed_by_the_first_import() {
    let source = "/* @license MIT */\n\nimport \"p\";\n";
    let out = transform(source);
    assert_eq!(out, "/* @license MIT */\nrequire(\"p\");\n");
    assert_eq!(count_occurrences(&out, "@license"), 1);
}

// =============================================================================
// Carve-outs and plain code
// =============================================================================

#[test]
fn arrow_expression_body_comment_is_never_misplaced() {
    // Pulling the comment onto a synthesized list could detach it from
    // the expression; the carve-out drops it instead of corrupting code.
    let out = transform("var f = () => /* inline */ 1;\n");
    assert_eq!(out, "var f = () => 1;\n");
}

#[test]
fn call_argument_comment_prints_inline() {
    let out = transform("f(/* c */ a);\n");
    assert_eq!(out, "f(/* c */ a);\n");
}

#[test]
fn initializer_comment_prints_inline() {
    let out = transform("var x = /* v */ 1;\n");
    assert_eq!(out, "var x = /* v */ 1;\n");
}

#[test]
fn code_without_comments_is_untouched() {
    let out = transform("var a = 1;\nf(a);\nclass C {\n}\n");
    assert_eq!(out, "var a = 1;\nf(a);\nclass C {\n}\n");
}

#[test]
fn block_header_comment_stays_inside_the_block() {
    let out = transform("{\n    // inner\n\n    f();\n}\n");
    assert_eq!(out, "{\n    // inner\n    f();\n}\n");
}

// =============================================================================
// Pipeline state errors
// =============================================================================

#[test]
fn post_pass_before_pre_pass_is_a_loud_error() {
    let mut parser = ParserState::new("a.ts", "f();");
    let root = parser.parse_source_file().unwrap();
    let (file, arena) = parser.into_parts();
    let mut pipeline = Pipeline::new();
    let err = pipeline.post_pass(&file, &arena, root).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Session(SessionError::Missing { .. })
    ));
    assert!(err.to_string().contains("a.ts"));
}
