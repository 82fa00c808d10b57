//! Prompt text for both question-answering backends.
//!
//! Everything the user sees is Spanish, so the prompts are too.

/// The only answer allowed when the context does not contain one.
pub const UNKNOWN_ANSWER: &str = "No lo sé";

/// Separator between retrieved chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Inputs that end an interactive session.
pub const EXIT_COMMANDS: &[&str] = &["salir", "exit", "quit"];

/// Instructions that confine the model to the retrieved text.
const LOCAL_CONSULTATION_RULES: &str = r#"ERES UN PROGRAMA DE CONSULTA LOCAL SIN ACCESO A INTERNET.

RESTRICCIONES ABSOLUTAS:
1. NO TIENES CONOCIMIENTO PREVIO.
2. NO TIENES ACCESO A INTERNET.
3. NO PUEDES CONSULTAR NINGUNA BASE DE DATOS EXTERNA.
4. SOLO EXISTE EL TEXTO AUTORIZADO QUE APARECE ABAJO."#;

/// Build the constrained prompt for one question over retrieved chunks.
pub fn make_local_consultation_prompt(context: &str, question: &str) -> String {
    format!(
        r#"{rules}

TEXTO AUTORIZADO (única fuente de información):
================================================
{context}
================================================

INSTRUCCIONES:
- LEE SOLO EL TEXTO AUTORIZADO.
- SI LA PREGUNTA NO SE RESPONDE CON ESE TEXTO, RESPONDE EXACTAMENTE: "{unknown}"
- NO USES NINGÚN OTRO CONOCIMIENTO.
- NO DES EXPLICACIONES.
- NO MENCIONES INTERNET NI QUE ERES UN MODELO DE LENGUAJE.

Pregunta: {question}

Respuesta:"#,
        rules = LOCAL_CONSULTATION_RULES,
        context = context,
        unknown = UNKNOWN_ANSWER,
        question = question,
    )
}

/// Join retrieved chunk texts into one context block.
pub fn join_context<'a>(chunks: impl IntoIterator<Item = &'a str>) -> String {
    chunks.into_iter().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// ChatPDF only reads one source per message, so the question names them all.
pub fn make_multi_document_question(document_count: usize, question: &str) -> String {
    format!(
        "Tengo {} documentos PDF. Usando TODOS los documentos cargados, responde: {}",
        document_count, question
    )
}

/// True for `salir`, `exit` or `quit`, in any case.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_COMMANDS.iter().any(|c| c.eq_ignore_ascii_case(input))
}
