//! Command-line driver: read a model or request document, run an analysis,
//! print the result document to stdout.

use std::path::Path;
use std::process::ExitCode;

use strucore_io::{
    AnalysisKind, AnalysisRequest, BucklingResultDoc, DynamicResultDoc, ErrorDoc, ModalResultDoc,
    ModelDoc, NonlinearResultDoc, StaticResultDoc,
};
use strucore_model::Model;
use strucore_solver::{
    BucklingSolver, DynamicSolver, ModalSolver, NonlinearOptions, NonlinearSolver, SolverError,
    StaticSolver,
};

fn usage() {
    eprintln!("usage:");
    eprintln!("  strucore-cli run <request.json>");
    eprintln!("  strucore-cli static <model.json>");
    eprintln!("  strucore-cli modal <model.json> [num_modes]");
    eprintln!("  strucore-cli buckling <model.json> [num_modes]");
    eprintln!("  strucore-cli nonlinear <model.json>");
    eprintln!("  strucore-cli validate <model.json>");
    eprintln!("  strucore-cli --help");
    eprintln!("  strucore-cli --version");
    eprintln!();
    eprintln!("examples:");
    eprintln!("  strucore-cli static demos/axial_truss.json");
    eprintln!("  strucore-cli modal demos/axial_truss.json 4");
    eprintln!("  strucore-cli run demos/dynamic_request.json");
}

fn load_model(path: &Path) -> Result<Model, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let doc = ModelDoc::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))?;
    doc.into_model().map_err(|e| e.to_string())
}

fn print_result<T: serde::Serialize>(doc: &T) -> ExitCode {
    match serde_json::to_string_pretty(doc) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to serialize result: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_solver_error(err: &SolverError) -> ExitCode {
    let _ = print_result(&ErrorDoc::from(err));
    ExitCode::FAILURE
}

fn run_static(model: &Model) -> ExitCode {
    match StaticSolver::new(model).solve() {
        Ok(results) => print_result(&StaticResultDoc::from(&results)),
        Err(err) => print_solver_error(&err),
    }
}

fn run_modal(model: &Model, num_modes: usize) -> ExitCode {
    match ModalSolver::new(model).solve(num_modes) {
        Ok(results) => print_result(&ModalResultDoc::from(&results)),
        Err(err) => print_solver_error(&err),
    }
}

fn run_buckling(model: &Model, num_modes: usize) -> ExitCode {
    match BucklingSolver::new(model).solve(num_modes) {
        Ok(results) => print_result(&BucklingResultDoc::from(&results)),
        Err(err) => print_solver_error(&err),
    }
}

fn run_nonlinear(model: &Model, options: NonlinearOptions) -> ExitCode {
    match NonlinearSolver::new(model, options).solve() {
        Ok(results) => {
            let doc = NonlinearResultDoc::from(&results);
            let code = if doc.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
            let _ = print_result(&doc);
            code
        }
        Err(err) => print_solver_error(&err),
    }
}

fn run_request(path: &Path) -> ExitCode {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let request: AnalysisRequest = match serde_json::from_str(&json) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let model = match request.model.into_model() {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "[{}] running {:?} analysis",
        chrono::Utc::now().to_rfc3339(),
        request.analysis
    );

    match request.analysis {
        AnalysisKind::Static => run_static(&model),
        AnalysisKind::Modal => run_modal(&model, request.num_modes),
        AnalysisKind::Buckling => run_buckling(&model, request.num_modes),
        AnalysisKind::Nonlinear => {
            run_nonlinear(&model, request.nonlinear.unwrap_or_default())
        }
        AnalysisKind::Dynamic => {
            let Some(options) = request.dynamic else {
                eprintln!("dynamic analysis requires the \"dynamic\" options block");
                return ExitCode::FAILURE;
            };
            match DynamicSolver::new(&model, options).solve() {
                Ok(results) => print_result(&DynamicResultDoc::new(
                    &results,
                    options.time_step,
                    options.total_time,
                )),
                Err(err) => print_solver_error(&err),
            }
        }
    }
}

fn run_validate(model: &Model) -> ExitCode {
    match model.validate() {
        Ok(()) => {
            println!(
                "model ok: {} nodes, {} elements, {} loads, {} constraints",
                model.nodes().len(),
                model.elements().len(),
                model.loads().len(),
                model.constraints().len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("model invalid: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_modes(arg: Option<&String>) -> usize {
    arg.and_then(|s| s.parse().ok()).unwrap_or(10)
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
        return ExitCode::FAILURE;
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            usage();
            ExitCode::SUCCESS
        }
        "--version" | "-V" => {
            println!("strucore-cli {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "run" if args.len() >= 3 => run_request(Path::new(&args[2])),
        command @ ("static" | "modal" | "buckling" | "nonlinear" | "validate")
            if args.len() >= 3 =>
        {
            let model = match load_model(Path::new(&args[2])) {
                Ok(model) => model,
                Err(e) => {
                    eprintln!("{e}");
                    return ExitCode::FAILURE;
                }
            };
            match command {
                "static" => run_static(&model),
                "modal" => run_modal(&model, parse_modes(args.get(3))),
                "buckling" => run_buckling(&model, parse_modes(args.get(3))),
                "nonlinear" => run_nonlinear(&model, NonlinearOptions::default()),
                _ => run_validate(&model),
            }
        }
        _ => {
            usage();
            ExitCode::FAILURE
        }
    }
}
