//! Request identity: the mobile-app user agent and fixed headers.

/// Placeholder in [`USER_AGENT_TEMPLATE`] replaced by the device id.
pub const BUVID_PLACEHOLDER: &str = "${BUVID}";

pub const USER_AGENT_TEMPLATE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5_1 like Mac OS X) \
AppleWebKit/618.2.12.10.9 (KHTML, like Gecko) Mobile/21F90 BiliApp/80300100 os/ios \
model/iPhone 14 Pro Max mobi_app/iphone build/80300100 osVer/17.5.1 network/2 channel/AppStore \
Buvid/${BUVID} c_locale/zh-Hans_CN s_locale/zh-Hans_JP sessionID/11fa54f6 disable_rcmd/0";

pub const REFERER_URL: &str = "https://www.bilibili.com/blackboard/bw/2024/bws_event.html\
?navhide=1&stahide=1&native.theme=2&night=1#/Order/FieldOrder";

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn user_agent(buvid: &str) -> String {
    USER_AGENT_TEMPLATE.replace(BUVID_PLACEHOLDER, buvid.trim())
}
