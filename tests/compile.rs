//! Offline tests of the text → document → PDF compiler.
//!
//! No model, no network: every test feeds model-style text straight into the
//! public compiler API.

use notes2guide::compiler::layout::Element;
use notes2guide::{
    compile, compile_text, compile_to_pdf, layout, output_file_name, Block, GuideConfig,
    Sanitizer, Theme, DEFAULT_TITLE,
};

const SAMPLE: &str = "\
**La Célula**
He analizado tus fotos y aquí tienes la guía.
SECCIÓN: Qué es una célula
CONTEXTO: Todo ser vivo está hecho de células; entenderlas explica cómo funciona el cuerpo.
La célula es la unidad básica de la vida.
ANALOGÍA: Una célula es como una ciudad con fábricas, muros y una alcaldía.
pregunta: ¿Qué orgánulo produce la energía?
RETO: Dibuja una célula de memoria y nombra tres partes.
NOTA: No confundas célula animal con célula vegetal.
```
(Recuerda repasar mañana)
¡Mucho éxito en tu examen!
";

// ── Compiler ─────────────────────────────────────────────────────────────────

#[test]
fn sample_compiles_to_expected_blocks() {
    let doc = compile(SAMPLE, "ana@example.com");
    assert_eq!(doc.title, "La Célula");
    assert_eq!(doc.author, "ana@example.com");
    assert_eq!(
        doc.blocks,
        vec![
            Block::Heading { label: "Qué es una célula".into() },
            Block::ContextNote {
                payload: "Todo ser vivo está hecho de células; entenderlas explica cómo funciona el cuerpo.".into()
            },
            Block::Paragraph { payload: "La célula es la unidad básica de la vida.".into() },
            Block::AnalogyNote {
                payload: "Una célula es como una ciudad con fábricas, muros y una alcaldía.".into()
            },
            Block::ChallengeQuestion { payload: "¿Qué orgánulo produce la energía?".into() },
            Block::ChallengeQuestion {
                payload: "Dibuja una célula de memoria y nombra tres partes.".into()
            },
            Block::Warning { payload: "No confundas célula animal con célula vegetal.".into() },
        ]
    );
}

#[test]
fn worked_example_from_the_guide_format() {
    let raw = "Fotosíntesis\nSECCIÓN: Introducción\nCONTEXTO: Sirve para producir energía\nANALOGÍA: Es como una fábrica solar\n¡Listo! espero que te sirva";
    let doc = compile(raw, "ana@example.com");
    assert_eq!(doc.title, "Fotosíntesis");
    assert_eq!(doc.blocks.len(), 3);
    assert!(matches!(doc.blocks[0], Block::Heading { .. }));
    assert!(matches!(doc.blocks[1], Block::ContextNote { .. }));
    assert!(matches!(doc.blocks[2], Block::AnalogyNote { .. }));
}

#[test]
fn sanitizer_is_idempotent_on_sample() {
    let s = Sanitizer::default();
    let once = s.sanitize(SAMPLE);
    assert_eq!(s.sanitize(&once), once);
    assert!(!once.contains('*'));
    assert!(!once.contains("```"));
}

#[test]
fn classification_does_not_depend_on_neighbours() {
    let lines: Vec<&str> = SAMPLE.lines().skip(1).collect();
    let whole = compile(SAMPLE, "a").blocks;

    let one_by_one: Vec<Block> = lines
        .iter()
        .filter_map(|l| compile(&format!("T\n{l}"), "a").blocks.into_iter().next())
        .collect();
    assert_eq!(whole, one_by_one);
}

#[test]
fn empty_output_gets_default_title_and_renders() {
    let doc = compile("", "a");
    assert_eq!(doc.title, DEFAULT_TITLE);
    assert!(doc.blocks.is_empty());

    let tree = layout(&doc, &Theme::default());
    let has_placeholder = tree.elements.iter().any(|e| match e {
        Element::Text(t) => t.text == Theme::default().placeholder,
        _ => false,
    });
    assert!(has_placeholder);

    let pdf = compile_to_pdf("", "a").expect("render");
    assert!(pdf.bytes.starts_with(b"%PDF"));
}

// ── Rendering ────────────────────────────────────────────────────────────────

#[test]
fn sample_renders_to_a_single_page_pdf() {
    let pdf = compile_to_pdf(SAMPLE, "ana@example.com").expect("render");
    assert!(pdf.bytes.starts_with(b"%PDF"));
    assert_eq!(pdf.page_count, 1);
}

#[test]
fn long_guide_spans_several_pages() {
    let mut raw = String::from("Historia de Roma\n");
    for i in 1..=30 {
        raw.push_str(&format!("SECCIÓN: Periodo {i}\n"));
        raw.push_str("CONTEXTO: Conocer este periodo ayuda a entender las instituciones que heredamos.\n");
        raw.push_str(&"Roma creció de aldea a imperio mediante conquistas, alianzas y reformas. ".repeat(5));
        raw.push('\n');
        raw.push_str("PREGUNTA: ¿Qué cambió respecto al periodo anterior?\n");
    }
    let pdf = compile_to_pdf(&raw, "a").expect("render");
    assert!(pdf.page_count >= 4, "only {} pages", pdf.page_count);
}

#[test]
fn compile_text_fills_stats_and_file_name() {
    let config = GuideConfig::builder().author("ana@example.com").build().unwrap();
    let out = compile_text(SAMPLE, &config).expect("compile");
    assert_eq!(out.file_name, "La_Célula.pdf");
    assert_eq!(out.stats.blocks, 7);
    assert_eq!(out.stats.dropped_lines, 4);
    assert!(!out.stats.default_title);
    assert_eq!(out.stats.pages, 1);
    assert_eq!(out.stats.pdf_bytes, out.pdf.len());
    assert_eq!(out.raw_text, SAMPLE);
}

#[test]
fn custom_theme_strings_reach_the_layout() {
    let mut theme = Theme::default();
    theme.footer = "Mi academia".into();
    let tree = layout(&compile("T\nx", "a"), &theme);
    assert_eq!(tree.footer.text, "Mi academia");
}

#[test]
fn json_output_has_block_kinds_and_no_pdf_bytes() {
    let out = compile_text(SAMPLE, &GuideConfig::default()).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["document"]["blocks"][0]["kind"], "heading");
    assert_eq!(json["document"]["blocks"][0]["label"], "Qué es una célula");
    assert!(json.get("pdf").is_none());
    assert_eq!(json["stats"]["blocks"], 7);
}

#[test]
fn file_names_follow_titles() {
    assert_eq!(output_file_name("La Célula"), "La_Célula.pdf");
    assert_eq!(output_file_name("Guía de Aprendizaje"), "Guía_de_Aprendizaje.pdf");
}
