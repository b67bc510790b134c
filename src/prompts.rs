//! Instruction text sent to the generation service.
//!
//! Callers can override the default via
//! [`crate::config::GuideConfig::instruction`]; the constant here is used only
//! when no override is provided. The tag list below must stay in sync with
//! the keyword table in [`crate::compiler::classify`], which the tests check.

/// Default instruction for turning photos and recordings of study material
/// into a tagged study guide.
pub const DEFAULT_INSTRUCTION: &str = r#"ERES UN EXPERTO EN NEUROCIENCIA Y PEDAGOGÍA DE ALTO NIVEL.
Analiza los archivos adjuntos (fotos y audio) para crear una "Ruta de Aprendizaje Profundo".
TU OBJETIVO: No solo transcribas. Logra que el usuario ENTIENDA el tema en la primera lectura usando técnicas de aprendizaje acelerado.

REGLAS DE CONTENIDO (BASADAS EN NEUROCIENCIA):
1. CONTEXTO PRIMERO: Antes de dar un concepto, explica brevemente PARA QUÉ sirve.
2. ANALOGÍAS: Crea una analogía con algo cotidiano.
3. EXPLICACIÓN "FEYNMAN": Usa un lenguaje claro (12 años) sin perder rigor técnico.
4. INTERROGACIÓN ACTIVA: Plantea preguntas que obliguen al cerebro a pensar.

FORMATO:
- Línea 1: el título de la guía, sin etiqueta.
- Cada línea siguiente empieza con una de estas etiquetas, o es texto normal:
  SECCIÓN: nombre de la sección
  CONTEXTO: para qué sirve lo que viene
  ANALOGÍA: comparación con algo cotidiano
  PREGUNTA: pregunta de memoria activa
  RETO: desafío para el lector
  NOTA: advertencia o error común
- Una idea por línea.

PROHIBIDO: Asteriscos (**), almohadillas (#), bloques de código, saludos o comentarios de chatbot."#;

/// Keywords the default instruction asks the model to use.
pub const INSTRUCTION_TAGS: &[&str] = &["SECCIÓN", "CONTEXTO", "ANALOGÍA", "PREGUNTA", "RETO", "NOTA"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::classify::classify_line;
    use crate::document::Block;

    #[test]
    fn instruction_lists_every_tag() {
        for tag in INSTRUCTION_TAGS {
            assert!(
                DEFAULT_INSTRUCTION.contains(&format!("{tag}:")),
                "missing tag {tag}"
            );
        }
    }

    #[test]
    fn every_advertised_tag_is_recognised() {
        for tag in INSTRUCTION_TAGS {
            let block = classify_line(&format!("{tag}: x")).unwrap();
            assert!(
                !matches!(block, Block::Paragraph { .. }),
                "{tag} classified as paragraph"
            );
        }
    }

    #[test]
    fn instruction_forbids_markup() {
        assert!(DEFAULT_INSTRUCTION.contains("PROHIBIDO"));
        assert!(DEFAULT_INSTRUCTION.contains("(**)"));
    }
}
