//! Interactive question loop over the answer pipeline.

use std::future::Future;
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::error;

use crate::config::{ProviderConfig, Settings};
use crate::error::{RagError, RagResult};
use crate::search::{RagPipeline, SearchOutcome};
use crate::store::VectorStore;

const RULE_WIDE: usize = 60;
const RULE_ANSWER: usize = 53;
const RULE_HELP: usize = 40;
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Quit,
    Empty,
    Question(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.to_lowercase().as_str() {
            "" => Command::Empty,
            "help" => Command::Help,
            "clear" => Command::Clear,
            "quit" => Command::Quit,
            _ => Command::Question(input.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemStatus {
    pub documents: usize,
    pub provider: ProviderConfig,
}

/// Startup gate: a provider credential must be configured and the collection
/// must already hold documents.
pub async fn validate_system(settings: &Settings, store: &dyn VectorStore) -> RagResult<SystemStatus> {
    let provider = settings.resolve_provider()?;
    let documents = store.count(&settings.collection_name).await?;
    if documents == 0 {
        return Err(RagError::EmptyCollection(settings.collection_name.clone()));
    }
    Ok(SystemStatus {
        documents,
        provider,
    })
}

pub struct Shell<R, W> {
    input: Lines<R>,
    out: W,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            input: input.lines(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn print_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDE))?;
        writeln!(self.out, "CHAT COM PDF - Sistema de Busca Inteligente")?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDE))?;
        writeln!(self.out, "Faça perguntas baseadas no PDF carregado!")?;
        writeln!(self.out, "Digite 'quit' para encerrar")?;
        writeln!(self.out, "Digite 'help' para ver comandos disponíveis")?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDE))
    }

    pub fn print_help(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n{}", "=".repeat(RULE_HELP))?;
        writeln!(self.out, "COMANDOS DISPONÍVEIS:")?;
        writeln!(self.out, "{}", "=".repeat(RULE_HELP))?;
        writeln!(self.out, "help      - Mostra esta ajuda")?;
        writeln!(self.out, "clear     - Limpa a tela")?;
        writeln!(self.out, "quit      - Encerra o chat")?;
        writeln!(self.out, "{}", "-".repeat(RULE_HELP))?;
        writeln!(self.out, "Para fazer perguntas, apenas digite sua pergunta!")?;
        writeln!(self.out, "{}\n", "=".repeat(RULE_HELP))
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        write!(self.out, "{CLEAR_SCREEN}")?;
        self.out.flush()
    }

    pub fn print_status(&mut self, status: &SystemStatus) -> io::Result<()> {
        let models = &status.provider.settings().models;
        writeln!(self.out, "Sistema configurado corretamente!")?;
        writeln!(
            self.out,
            "Encontrados {} documentos no banco de dados",
            status.documents
        )?;
        writeln!(
            self.out,
            "Usando {} ({} + {})",
            status.provider.label(),
            models.embedding,
            models.chat
        )?;
        writeln!(self.out, "\nSistema iniciado! Pode começar a fazer perguntas.\n")
    }

    pub fn print_startup_error(&mut self, err: &RagError) -> io::Result<()> {
        match err {
            RagError::MissingCredentials => {
                writeln!(self.out, "ERRO: Nenhuma API key configurada!")?;
                writeln!(self.out, "Configure GOOGLE_API_KEY ou OPENAI_API_KEY no arquivo .env")?;
            }
            RagError::EmptyCollection(_) => {
                writeln!(self.out, "ERRO: Nenhum documento encontrado no banco!")?;
                writeln!(self.out, "Execute primeiro: pdf-rag-chat ingest")?;
            }
            other => {
                writeln!(self.out, "ERRO na validação: {other}")?;
                writeln!(
                    self.out,
                    "Verifique se o banco de dados está rodando e o PDF foi processado"
                )?;
            }
        }
        writeln!(
            self.out,
            "\nSistema não está pronto. Corrija os erros acima e tente novamente."
        )
    }

    pub fn print_outcome(&mut self, outcome: &SearchOutcome) -> io::Result<()> {
        let answer = match outcome {
            SearchOutcome::Answered(answer) => answer,
            SearchOutcome::Failed(message) => return writeln!(self.out, "\n{message}"),
        };

        writeln!(self.out, "\n{}", "=".repeat(RULE_ANSWER))?;
        writeln!(self.out, "RESPOSTA:")?;
        writeln!(self.out, "{}", "=".repeat(RULE_ANSWER))?;
        writeln!(self.out, "{}", answer.answer)?;

        if !answer.sources.is_empty() {
            writeln!(self.out, "\n{}", "=".repeat(RULE_ANSWER))?;
            writeln!(self.out, "FONTES CONSULTADAS:")?;
            writeln!(self.out, "{}", "=".repeat(RULE_ANSWER))?;
            for (i, source) in answer.sources.iter().enumerate() {
                writeln!(self.out, "\nFonte {}:", i + 1)?;
                writeln!(self.out, "   {}", source.content)?;
                writeln!(self.out, "   Página: {}", source.metadata.page)?;
            }
        }
        writeln!(self.out, "{}", "=".repeat(RULE_ANSWER))
    }

    /// Runs until `quit`, end of input, or `shutdown` resolving (Ctrl+C).
    pub async fn run<S>(&mut self, pipeline: &RagPipeline<'_>, shutdown: S) -> io::Result<()>
    where
        S: Future,
    {
        tokio::pin!(shutdown);

        loop {
            write!(self.out, "Você: ")?;
            self.out.flush()?;

            let line = tokio::select! {
                line = self.input.next_line() => Some(line),
                _ = &mut shutdown => None,
            };
            let line = match line {
                Some(Ok(Some(line))) => line,
                Some(Ok(None)) => return writeln!(self.out, "\nAté logo! Obrigado por usar o sistema."),
                Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    error!("Unreadable input line: {e}");
                    writeln!(self.out, "\nErro inesperado: {e}")?;
                    writeln!(self.out, "Tente novamente ou digite 'quit' para encerrar.")?;
                    continue;
                }
                Some(Err(e)) => return Err(e),
                None => return self.print_interrupted(),
            };

            match Command::parse(&line) {
                Command::Quit => {
                    return writeln!(self.out, "\nAté logo! Obrigado por usar o sistema.");
                }
                Command::Help => self.print_help()?,
                Command::Clear => {
                    self.clear_screen()?;
                    self.print_header()?;
                }
                Command::Empty => {
                    writeln!(self.out, "Por favor, digite uma pergunta ou comando.")?;
                }
                Command::Question(question) => {
                    writeln!(self.out, "\nBuscando informações...")?;
                    self.out.flush()?;

                    let answering = AssertUnwindSafe(pipeline.search_and_answer(&question)).catch_unwind();
                    let outcome = tokio::select! {
                        outcome = answering => Some(outcome),
                        _ = &mut shutdown => None,
                    };
                    match outcome {
                        Some(Ok(outcome)) => self.print_outcome(&outcome)?,
                        Some(Err(_)) => {
                            error!("Answer pipeline panicked for question: {question}");
                            writeln!(self.out, "\nErro inesperado ao processar a pergunta.")?;
                            writeln!(self.out, "Tente novamente ou digite 'quit' para encerrar.")?;
                        }
                        None => return self.print_interrupted(),
                    }
                    writeln!(self.out)?;
                }
            }
        }
    }

    fn print_interrupted(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n\nInterrompido pelo usuário. Até logo!")
    }
}
