//! End-to-end pipeline tests covering the concrete scenarios from
//! `spec.md` §8.

use rstest::rstest;

use poml::reader::ReadOptions;
use poml::resolver::FsResolver;
use poml::stylesheet::Stylesheet;
use poml::value::Context;
use poml::writer::WriteOptions;
use poml::{read, write, write_with_source_map};

fn compile(source: &str) -> (poml::CompileIr, WriteOptions) {
    let mut ctx = Context::new();
    let stylesheet = Stylesheet::new();
    let resolver = FsResolver;
    let options = ReadOptions::default();
    let compiled = read(source, None, &options, &mut ctx, &stylesheet, &resolver);
    (compiled, WriteOptions::default())
}

#[test]
fn scenario_1_two_paragraphs_markdown() {
    let (compiled, opts) = compile("<poml><p>Hello</p><p>World</p></poml>");
    assert!(compiled.errors.is_empty());
    let (result, errors) = write(&compiled.ir, &opts);
    assert!(errors.is_empty());
    assert_eq!(result.output, "Hello\n\nWorld");
}

#[test]
fn scenario_2_speaker_mode_two_messages() {
    let (compiled, opts) = compile(
        r#"<poml><p speaker="system">S</p><p speaker="human">H</p></poml>"#,
    );
    let mapped = write_with_source_map(&compiled.ir, &opts);
    assert_eq!(mapped.messages.len(), 2);
    assert_eq!(mapped.messages[0].speaker.as_str(), "system");
    assert_eq!(mapped.messages[1].speaker.as_str(), "human");
}

#[test]
fn scenario_3_for_loop_over_let_bound_array() {
    let (compiled, opts) = compile(
        r#"<poml><let name="xs" value="[1,2,3]"/><list><item for="x in xs">{{x}}</item></list></poml>"#,
    );
    assert!(compiled.errors.is_empty());
    let (result, _) = write(&compiled.ir, &opts);
    assert_eq!(result.output, "- 1\n- 2\n- 3");
}

#[test]
fn scenario_6_table_renders_gfm_pipes() {
    let (compiled, opts) = compile(concat!(
        "<poml><table><thead><trow><tcell>A</tcell><tcell>B</tcell></trow></thead>",
        "<tbody><trow><tcell>1</tcell><tcell>2</tcell></trow></tbody></table></poml>",
    ));
    let (result, _) = write(&compiled.ir, &opts);
    assert_eq!(result.output, "| A | B |\n| - | - |\n| 1 | 2 |");
}

#[rstest]
#[case("<poml><p>Only one</p></poml>", "human")]
#[case(r#"<poml><p speaker="ai">reply</p></poml>"#, "ai")]
fn single_speaker_run_coercion(#[case] source: &str, #[case] expected: &str) {
    let (compiled, opts) = compile(source);
    let mapped = write_with_source_map(&compiled.ir, &opts);
    assert_eq!(mapped.speaker_runs.len(), 1);
    assert_eq!(mapped.speaker_runs[0].speaker.as_str(), expected);
}

#[test]
fn unknown_speaker_is_rejected_and_ignored() {
    let (compiled, opts) = compile(r#"<poml><p speaker="narrator">oops</p></poml>"#);
    let mapped = write_with_source_map(&compiled.ir, &opts);
    assert!(mapped.errors.iter().any(|e| e.message.contains("narrator")));
    assert_eq!(mapped.speaker_runs.len(), 1);
}

#[test]
fn scenario_5_token_limit_on_the_root_drops_the_lower_priority_paragraph() {
    let (compiled, opts) = compile(
        r#"<poml tokenLimit="3"><p priority="1">drop me</p><p priority="2">keep</p></poml>"#,
    );
    assert!(compiled.errors.is_empty());
    let (result, _) = write(&compiled.ir, &opts);
    assert_eq!(result.output, "keep");
}

#[test]
fn list_style_set_through_a_real_component_renders_decimal_items() {
    let (compiled, opts) = compile(
        r#"<poml><list style="decimal"><item>a</item><item>b</item></list></poml>"#,
    );
    assert!(compiled.errors.is_empty());
    let (result, _) = write(&compiled.ir, &opts);
    assert_eq!(result.output, "1. a\n2. b");
}

#[test]
fn include_transparency_is_not_exercised_without_a_file() {
    // `include` resolution is covered by `reader::include` unit tests against
    // a real tempdir; this just confirms a document with no includes at all
    // compiles with an empty error collection (the baseline for comparison).
    let (compiled, _) = compile("<poml><p>no includes here</p></poml>");
    assert!(compiled.errors.is_empty());
}
