//! Chromium-backed implementations of the browser traits.

use anyhow::Result;
use async_trait::async_trait;
use browser_client::{BrowserPage, BrowserSession, IdleOptions, LaunchOptions};

use crate::traits::{BrowserLauncher, ProfileBrowser, ProfilePage};

pub struct ChromeLauncher {
    launch: LaunchOptions,
    idle: IdleOptions,
}

impl ChromeLauncher {
    pub fn new(chrome_executable: Option<String>) -> Self {
        Self {
            launch: LaunchOptions {
                chrome_executable,
                headful: false,
            },
            idle: IdleOptions::default(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn ProfileBrowser>> {
        let session = BrowserSession::launch(&self.launch).await?;
        Ok(Box::new(ChromeBrowser {
            session,
            idle: self.idle,
        }))
    }
}

pub struct ChromeBrowser {
    session: BrowserSession,
    idle: IdleOptions,
}

#[async_trait]
impl ProfileBrowser for ChromeBrowser {
    async fn open_page(&self) -> Result<Box<dyn ProfilePage>> {
        let page = self.session.new_page().await?;
        Ok(Box::new(ChromePage {
            page,
            idle: self.idle,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}

pub struct ChromePage {
    page: BrowserPage,
    idle: IdleOptions,
}

#[async_trait]
impl ProfilePage for ChromePage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.page.goto(url, self.idle).await?;
        Ok(())
    }

    async fn text_of(&mut self, selector: &str) -> Result<Option<String>> {
        Ok(self.page.text_of(selector).await?)
    }

    async fn close(&mut self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}
