//! Candidate lists for the e+ pages, most specific first.

use action_locator::CandidateList;
use ticketpilot_core_types::AnchorDescriptor as A;

/// Marker text of a performance whose sale is open.
pub const ACCEPTING_MARKER: &str = "受付中";

/// Ancestors that group a performance row with its action button.
pub const EVENT_CONTAINER: &str =
    ".eventlist__item, .item, article, section, li, div[class*=\"event\"]";

pub const DELIVERY_RADIOS: &str = "input[type='radio'][name='vuketoriHohoSentaku']";
pub const PAYMENT_RADIOS: &str = "input[type='radio'][name='vsiharaiHohoSentaku']";

/// Elements carrying the "accepting" marker. `*` matches every element
/// whose text contains the phrase, so the last match is the innermost one.
pub fn accepting_marker() -> A {
    A::text("*", ACCEPTING_MARKER)
}

/// The "次へ" action inside an open performance's container.
pub fn next_in_container() -> CandidateList {
    CandidateList::from_anchors(
        "next-in-container",
        [
            A::text("button", "次へ"),
            A::text("a", "次へ"),
            A::text("button.button--primary", "次へ"),
            A::text("button[type='submit']", "次へ"),
        ],
    )
}

pub fn performance_select() -> CandidateList {
    row_select("performance-select", "公演日時", &["performance", "schedule", "date"])
}

pub fn seat_type_select() -> CandidateList {
    row_select("seat-type-select", "席種", &["seat", "ticket"])
}

pub fn quantity_select() -> CandidateList {
    row_select("quantity-select", "枚数", &["count", "quantity", "num"])
}

/// The `<select>` in the table row headed by `header`, then name/id guesses.
fn row_select(label: &str, header: &str, names: &[&str]) -> CandidateList {
    let mut list = CandidateList::new(label).with_anchor(A::xpath(format!(
        "//tr[.//th[contains(normalize-space(),'{header}')]]//select"
    )));
    for name in names {
        list = list.with_anchor(A::attribute("select", "name", *name));
    }
    for name in names {
        list = list.with_anchor(A::attribute("select", "id", *name));
    }
    list
}

/// Login entry on the ticket page, after options are chosen.
pub fn purchase_login_button() -> CandidateList {
    CandidateList::from_anchors(
        "purchase-login",
        [
            A::text("button", "ログイン"),
            A::text("a", "ログイン"),
            A::css("button.login-button"),
            A::text("button[type='submit']", "ログイン"),
        ],
    )
}

/// Header login link on the top page.
pub fn top_login_link() -> CandidateList {
    CandidateList::from_anchors(
        "top-login",
        [
            A::text("a", "ログイン"),
            A::text("button", "ログイン"),
            A::attribute("a", "href", "login"),
        ],
    )
}

pub fn email_input() -> CandidateList {
    CandidateList::from_anchors(
        "email-input",
        [
            A::css("input[name='login_id']"),
            A::css("input[type='email']"),
            A::css("input[name='loginid']"),
            A::css("input[name='email']"),
            A::css("input[id='loginid']"),
            A::css("input[autocomplete='username']"),
            A::attribute("input", "placeholder", "メール"),
            A::attribute("input", "placeholder", "ID"),
        ],
    )
}

pub fn password_input() -> CandidateList {
    CandidateList::from_anchors(
        "password-input",
        [
            A::css("input[name='login_pw']"),
            A::css("input[type='password']"),
            A::css("input[name='password']"),
            A::css("input[id='password']"),
            A::css("input[autocomplete='current-password']"),
            A::attribute("input", "placeholder", "パスワード"),
        ],
    )
}

pub fn login_submit() -> CandidateList {
    CandidateList::from_anchors(
        "login-submit",
        [
            A::text("button.button--primary.button--block", "ログイン"),
            A::text("button", "ログイン"),
            A::css("button[type='submit']"),
            A::css("input[type='submit']"),
            A::text("a", "ログイン"),
        ],
    )
}

/// "次へ" towards the confirmation page. Never a final order button.
pub fn advance_button() -> CandidateList {
    CandidateList::from_anchors(
        "advance",
        [
            A::text("button", "次へ"),
            A::text("button.button--primary", "次へ"),
            A::text("button[type='submit']", "次へ"),
            A::attribute("input[type='submit']", "value", "次へ"),
            A::text("a", "次へ"),
        ],
    )
}

pub fn lottery_entry() -> CandidateList {
    CandidateList::from_anchors(
        "lottery-entry",
        [
            A::text("button", "応募"),
            A::text("a", "応募"),
            A::text("button", "申し込む"),
            A::text("a", "申し込む"),
            A::attribute("*", "class", "entry"),
            A::attribute("*", "class", "apply"),
        ],
    )
}

pub fn lottery_confirm() -> CandidateList {
    CandidateList::from_anchors(
        "lottery-confirm",
        [
            A::text("button", "確認"),
            A::text("button", "次へ"),
            A::text("button", "進む"),
            A::css("button[type='submit']"),
            A::css("input[type='submit']"),
        ],
    )
}

pub fn purchase_button() -> CandidateList {
    CandidateList::from_anchors(
        "purchase",
        [
            A::text("button", "購入"),
            A::text("a", "購入"),
            A::text("button", "申し込む"),
            A::text("button", "今すぐ購入"),
        ],
    )
}

pub fn seat_choice_button() -> CandidateList {
    CandidateList::from_anchors(
        "seat-choice",
        [
            A::text("button", "座席を選ぶ"),
            A::attribute("*", "class", "seat-select"),
            A::text("button", "選択"),
        ],
    )
}

/// Quantity control on lottery / quick purchase pages; may be an input.
pub fn quantity_control() -> CandidateList {
    CandidateList::from_anchors(
        "quantity-control",
        [
            A::attribute("select", "name", "quantity"),
            A::attribute("select", "name", "ticket"),
            A::attribute("input", "name", "quantity"),
        ],
    )
}

pub fn cart_button() -> CandidateList {
    CandidateList::from_anchors(
        "cart",
        [
            A::text("button", "カートに入れる"),
            A::text("button", "次へ"),
            A::text("button", "確認"),
            A::css("button[type='submit']"),
        ],
    )
}
