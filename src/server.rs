use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, put, web, HttpResponse, ResponseError};

use crate::config::Config;
use crate::error::{Error, PortfolioError, Result};
use crate::portfolio::balancer::calculate_with_limit;
use crate::portfolio::report::CalculationReport;
use crate::portfolio::{Portfolio, Position};
use crate::store::PortfolioStore;

pub struct AppState {
    pub store: PortfolioStore,
    pub target_tolerance: f64,
    pub max_passes: u64,
}

impl AppState {
    pub fn new(store: PortfolioStore, config: &Config) -> Self {
        AppState {
            store,
            target_tolerance: config.target_tolerance,
            max_passes: config.max_passes,
        }
    }

    /// Diff of what calculating `portfolio` would change, once its targets
    /// add up to a full allocation.
    fn calculation(&self, portfolio: &Portfolio) -> Result<(Portfolio, CalculationReport)> {
        portfolio.check_targets(self.target_tolerance)?;
        let next = calculate_with_limit(portfolio, self.max_passes)?;
        let report = CalculationReport::new(portfolio, &next);
        debug!("Calculation result:\n{}", report);
        Ok((next, report))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct BalanceUpdate {
    balance: f64,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Portfolio(PortfolioError::UnknownTicker(_)) => StatusCode::NOT_FOUND,
            Error::Portfolio(PortfolioError::PassLimit(_))
            | Error::Portfolio(PortfolioError::QuantityOverflow(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Portfolio(_) => StatusCode::BAD_REQUEST,
            Error::Store(_) | Error::Config(_) | Error::Canceled => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody { error: self.to_string() })
    }
}

/// Runs file I/O and calculations on the blocking pool, off the worker thread.
async fn blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    web::block(f).await.map_err(|e| match e {
        BlockingError::Error(e) => e,
        BlockingError::Canceled => Error::Canceled,
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(balance)
        .service(get_portfolio)
        .service(put_portfolio)
        .service(put_balance)
        .service(add_position)
        .service(update_position)
        .service(remove_position)
        .service(get_calculation)
        .service(apply);
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .header("Location", "/portfolio")
        .finish()
}

#[post("/balance")]
async fn balance(state: web::Data<AppState>, portfolio: web::Json<Portfolio>) -> Result<HttpResponse> {
    let portfolio = portfolio.into_inner();
    let (_, report) = blocking(move || state.calculation(&portfolio)).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/portfolio")]
async fn get_portfolio(state: web::Data<AppState>) -> Result<HttpResponse> {
    let portfolio = blocking(move || Ok(state.store.load()?)).await?;
    Ok(HttpResponse::Ok().json(portfolio))
}

#[put("/portfolio")]
async fn put_portfolio(state: web::Data<AppState>, portfolio: web::Json<Portfolio>) -> Result<HttpResponse> {
    let portfolio = portfolio.into_inner();
    portfolio.validate()?;
    let portfolio = blocking(move || {
        state.store.save(&portfolio)?;
        Ok(portfolio)
    }).await?;
    info!("Replaced portfolio, {} positions", portfolio.positions.len());
    Ok(HttpResponse::Ok().json(portfolio))
}

#[put("/portfolio/balance")]
async fn put_balance(state: web::Data<AppState>, update: web::Json<BalanceUpdate>) -> Result<HttpResponse> {
    let new_balance = update.balance;
    let portfolio = blocking(move || state.store.modify(|p| {
        p.set_balance(new_balance)?;
        Ok(p.clone())
    })).await?;
    Ok(HttpResponse::Ok().json(portfolio))
}

#[post("/portfolio/positions")]
async fn add_position(state: web::Data<AppState>, position: web::Json<Position>) -> Result<HttpResponse> {
    let position = position.into_inner();
    let portfolio = blocking(move || state.store.modify(|p| {
        p.add_position(position)?;
        Ok(p.clone())
    })).await?;
    Ok(HttpResponse::Created().json(portfolio))
}

#[put("/portfolio/positions/{ticker}")]
async fn update_position(
    state: web::Data<AppState>,
    ticker: web::Path<String>,
    position: web::Json<Position>,
) -> Result<HttpResponse> {
    let (ticker, position) = (ticker.into_inner(), position.into_inner());
    let portfolio = blocking(move || state.store.modify(|p| {
        p.update_position(&ticker, position)?;
        Ok(p.clone())
    })).await?;
    Ok(HttpResponse::Ok().json(portfolio))
}

#[delete("/portfolio/positions/{ticker}")]
async fn remove_position(state: web::Data<AppState>, ticker: web::Path<String>) -> Result<HttpResponse> {
    let ticker = ticker.into_inner();
    let portfolio = blocking(move || state.store.modify(|p| {
        p.remove_position(&ticker)?;
        Ok(p.clone())
    })).await?;
    Ok(HttpResponse::Ok().json(portfolio))
}

#[get("/portfolio/calculation")]
async fn get_calculation(state: web::Data<AppState>) -> Result<HttpResponse> {
    let (_, report) = blocking(move || {
        let portfolio = state.store.load()?;
        state.calculation(&portfolio)
    }).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Calculates against the stored portfolio and keeps the result.
#[post("/portfolio/apply")]
async fn apply(state: web::Data<AppState>) -> Result<HttpResponse> {
    let report = blocking(move || state.store.modify(|p| {
        let (next, report) = state.calculation(p)?;
        *p = next;
        Ok(report)
    })).await?;
    info!("Applied calculation, balance now {}", report.balance.new_value);
    Ok(HttpResponse::Ok().json(report))
}
