//! Airtime top-up menu served by the `ussd-gateway` binary

use rvoip_ussd_core::interceptors::{shared, HmacAuth, Logging, RateLimit, Recover};
use rvoip_ussd_core::{Reply, Router as ScreenRouter};

const HOME: &str = "1) Check balance\n2) Buy airtime\n0) Exit";

/// Screens for the demo service. Requests must be signed when
/// `hmac_secret` is set.
pub fn airtime_menu(hmac_secret: Option<&str>) -> ScreenRouter {
    let mut screens = ScreenRouter::new("/home");
    screens.intercept(Recover::new());
    screens.intercept(Logging::new());
    if let Some(secret) = hmac_secret {
        screens.intercept(HmacAuth::new(secret));
    }

    screens.display("/home", |_ctx| Reply::con(format!("Welcome\n{}", HOME)));
    screens.input("/home", |ctx| match ctx.input() {
        "1" => {
            ctx.redirect("/balance");
            Reply::con("")
        }
        "2" => {
            ctx.redirect("/airtime/amount");
            Reply::con("")
        }
        "0" => Reply::end("Goodbye."),
        _ => Reply::con(format!("Invalid option\n{}", HOME)),
    });

    screens.display("/balance", |ctx| {
        ctx.set("balance", 123.45);
        Reply::con("Balance: 123.45 MZN\n0) Back")
    });
    screens.input("/balance", |ctx| {
        if ctx.input() == "0" {
            ctx.redirect("/home");
        }
        Reply::con("")
    });

    let mut airtime = screens.group("/airtime", Vec::new());
    airtime.display("/amount", |_ctx| Reply::con("Enter amount (MZN):"));
    airtime.input("/amount", |ctx| match ctx.input().parse::<u32>() {
        Ok(amount) if amount > 0 => {
            ctx.set("amount", amount);
            ctx.redirect("/airtime/confirm");
            Reply::con("")
        }
        _ => Reply::con("Invalid amount. Try again:"),
    });
    airtime.display("/confirm", |ctx| {
        Reply::con(format!(
            "Buy {} MZN of airtime?\n1) Yes\n0) Back",
            ctx.session().get_int("amount")
        ))
    });
    airtime.input_with(
        "/confirm",
        |ctx| match ctx.input() {
            "1" => Reply::end("Purchase complete. Thank you."),
            "0" => {
                ctx.redirect("/home");
                Reply::con("")
            }
            _ => Reply::con(""),
        },
        vec![shared(RateLimit::tight())],
    );

    screens
}
