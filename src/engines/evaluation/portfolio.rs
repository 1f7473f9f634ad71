use crate::engines::metrics::percent_change;

/// Tolerance for "price gain <= strategy gain" at a consistency checkpoint.
pub const PC_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Ephemeral state of one backtest run. All-in/all-out, long only.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub balance: f64,
    pub shares: f64,
    pub position: bool,
    pub num_trades: usize,
    pub risk_exposure: usize,
    pub daily_returns: Vec<f64>,
    pub pc_count: usize,
    pub checkpoints_fired: usize,
    checkpoint_price: f64,
    checkpoint_balance: f64,
    round_to_cents: bool,
}

impl SimulationState {
    /// Start flat with `starting_balance`, anchored at `anchor_price`.
    pub fn new(starting_balance: f64, anchor_price: f64, round_to_cents: bool) -> Self {
        Self {
            balance: starting_balance,
            shares: 0.0,
            position: false,
            num_trades: 0,
            risk_exposure: 0,
            daily_returns: Vec::new(),
            pc_count: 0,
            checkpoints_fired: 0,
            checkpoint_price: anchor_price,
            checkpoint_balance: starting_balance,
            round_to_cents,
        }
    }

    pub fn mark_to_market(&mut self, price: f64) {
        if self.position {
            self.set_balance(self.shares * price);
        }
    }

    /// Compare price and balance growth since the previous checkpoint; counts when
    /// the strategy kept up with the price.
    pub fn checkpoint(&mut self, price: f64) {
        let price_gain = percent_change(self.checkpoint_price, price);
        let strategy_gain = percent_change(self.checkpoint_balance, self.balance);
        if price_gain <= strategy_gain + PC_EPSILON {
            self.pc_count += 1;
        }
        self.checkpoints_fired += 1;
        self.checkpoint_price = price;
        self.checkpoint_balance = self.balance;
    }

    /// Apply the rule's decision at `price`.
    pub fn apply_decision(&mut self, invest: bool, price: f64) -> Option<TradeAction> {
        match (self.position, invest) {
            (false, true) => {
                self.num_trades += 1;
                self.position = true;
                self.shares = self.balance / price;
                self.set_balance(self.shares * price);
                Some(TradeAction::Buy)
            }
            (true, false) => {
                self.position = false;
                self.set_balance(self.shares * price);
                self.shares = 0.0;
                Some(TradeAction::Sell)
            }
            _ => None,
        }
    }

    fn set_balance(&mut self, balance: f64) {
        self.balance = if self.round_to_cents {
            (balance * 100.0).round() / 100.0
        } else {
            balance
        };
    }
}
