//! Blurs personal data before it can reach a screenshot.

/// Installed as an init script so every document in the session gets it.
/// Credential, card and contact inputs are blurred with CSS; text nodes that
/// look like e-mail addresses are rewritten to a masked form.
pub const PRIVACY_MASK_SCRIPT: &str = r#"(() => {
  const CSS = `
    input[type="password"], input[type="email"], input[name*="mail" i],
    input[name*="login_id" i], input[name*="card" i], input[autocomplete^="cc-"],
    input[name*="tel" i], input[name*="phone" i], input[name*="address" i],
    input[name*="kana" i], .user-name, .mypage-name {
      filter: blur(6px) !important;
    }`;
  const EMAIL = /[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}/g;
  const maskText = (root) => {
    const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
    let node;
    while ((node = walker.nextNode())) {
      if (EMAIL.test(node.nodeValue)) {
        node.nodeValue = node.nodeValue.replace(EMAIL, '***@***');
      }
      EMAIL.lastIndex = 0;
    }
  };
  const install = () => {
    if (!document.getElementById('tp-privacy-mask')) {
      const style = document.createElement('style');
      style.id = 'tp-privacy-mask';
      style.textContent = CSS;
      (document.head || document.documentElement).appendChild(style);
    }
    if (document.body) {
      maskText(document.body);
      new MutationObserver(() => maskText(document.body))
        .observe(document.body, { childList: true, subtree: true, characterData: true });
    }
  };
  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', install, { once: true });
  } else {
    install();
  }
})();"#;
